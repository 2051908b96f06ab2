//! Protocol definitions for PS 2000 B communication.
//!
//! This module contains the low-level protocol types including:
//! - Telegram encoding/decoding
//! - The object table
//! - Fixed-point scaling
//! - Payload conversion

pub mod object;
pub mod payload;
pub mod scaling;
pub mod telegram;

pub use object::{
    Access, Attribute, Encoding, OBJECTS, ObjectDescriptor, Quantity, describe, describe_number,
};
pub use payload::{decode_value, encode_value};
pub use telegram::{
    ANSWER_HEADER_LEN, CHECKSUM_LEN, MAX_PAYLOAD_LEN, REQUEST_HEADER_LEN, START_DELIMITER,
    Telegram, TelegramKind, checksum, encode as encode_request,
};
