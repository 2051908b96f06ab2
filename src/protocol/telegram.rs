//! Telegram encoding and decoding.
//!
//! Requests sent to the device:
//! ```text
//! ┌───────┬──────┬──────┬────────┬────────┬───────────────┬──────────┐
//! │ 0x7e  │ node │ type │ object │ length │    payload    │ checksum │
//! │ 1     │ 1    │ 1    │ 1      │ 1      │ length bytes  │ 1        │
//! └───────┴──────┴──────┴────────┴────────┴───────────────┴──────────┘
//! ```
//!
//! Answers from the device carry an extra status byte after the type:
//! ```text
//! ┌───────┬──────┬──────┬────────┬────────┬────────┬───────────────┬──────────┐
//! │ 0x7e  │ node │ 0x80 │ status │ object │ length │    payload    │ checksum │
//! └───────┴──────┴──────┴────────┴────────┴────────┴───────────────┴──────────┘
//! ```
//!
//! The checksum is the byte-wise sum of everything before it, modulo 256.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::protocol::object::ObjectDescriptor;

/// First byte of every telegram.
pub const START_DELIMITER: u8 = 0x7e;

/// Largest payload a telegram can carry.
pub const MAX_PAYLOAD_LEN: usize = 16;

/// Header size of a request (start, node, type, object, length).
pub const REQUEST_HEADER_LEN: usize = 5;

/// Header size of an answer (request header plus status).
pub const ANSWER_HEADER_LEN: usize = 6;

/// Size of the trailing checksum.
pub const CHECKSUM_LEN: usize = 1;

/// Smallest well-formed frame (an empty request).
pub const MIN_FRAME_LEN: usize = REQUEST_HEADER_LEN + CHECKSUM_LEN;

/// Telegram direction/type, taken from the transmission bits of the start
/// delimiter used by the PS 2000 B family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TelegramKind {
    /// Host asks for the value of an object.
    Query = 0x40,
    /// Device answers a query or a send.
    Answer = 0x80,
    /// Host writes the value of an object.
    Send = 0xc0,
}

impl TelegramKind {
    /// Parses a telegram type from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x40 => Some(Self::Query),
            0x80 => Some(Self::Answer),
            0xc0 => Some(Self::Send),
            _ => None,
        }
    }

    /// Header length for telegrams of this type.
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self {
            Self::Answer => ANSWER_HEADER_LEN,
            Self::Query | Self::Send => REQUEST_HEADER_LEN,
        }
    }
}

impl From<TelegramKind> for u8 {
    fn from(kind: TelegramKind) -> Self {
        kind as Self
    }
}

/// Computes the additive checksum of a byte sequence.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// A validated telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    node: u8,
    kind: TelegramKind,
    status: Option<u8>,
    object: u8,
    payload: Bytes,
}

impl Telegram {
    /// Builds an answer telegram, as sent by a device.
    ///
    /// # Panics
    ///
    /// Panics if the payload exceeds `MAX_PAYLOAD_LEN`.
    #[must_use]
    pub fn answer(node: u8, status: u8, object: u8, payload: &[u8]) -> Self {
        assert!(
            payload.len() <= MAX_PAYLOAD_LEN,
            "payload exceeds maximum telegram size"
        );
        Self {
            node,
            kind: TelegramKind::Answer,
            status: Some(status),
            object,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Device node address.
    #[must_use]
    pub const fn node(&self) -> u8 {
        self.node
    }

    /// Telegram type.
    #[must_use]
    pub const fn kind(&self) -> TelegramKind {
        self.kind
    }

    /// Raw status byte. Only answers carry one.
    #[must_use]
    pub const fn status(&self) -> Option<u8> {
        self.status
    }

    /// Object number.
    #[must_use]
    pub const fn object(&self) -> u8 {
        self.object
    }

    /// Payload bytes.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Serializes the telegram including its checksum.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            self.kind.header_len() + self.payload.len() + CHECKSUM_LEN,
        );
        buf.put_u8(START_DELIMITER);
        buf.put_u8(self.node);
        buf.put_u8(self.kind.into());
        if let Some(status) = self.status {
            buf.put_u8(status);
        }
        buf.put_u8(self.object);
        // Payload length is bounded by MAX_PAYLOAD_LEN at construction.
        buf.put_u8(self.payload.len() as u8);
        buf.put_slice(&self.payload);
        let sum = checksum(&buf);
        buf.put_u8(sum);
        buf.freeze()
    }

    /// Decodes and validates a complete frame.
    ///
    /// Validation order: minimum size, declared length bound, truncation,
    /// checksum, trailing bytes, start delimiter, telegram type. A frame is
    /// only returned once every check passed.
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        if frame.len() < MIN_FRAME_LEN {
            return Err(DecodeError::Truncated {
                expected: MIN_FRAME_LEN,
                got: frame.len(),
            });
        }

        // The layout is located from the type byte before it can be trusted;
        // the checksum below confirms it.
        let header_len = TelegramKind::from_byte(frame[2])
            .map_or(ANSWER_HEADER_LEN, TelegramKind::header_len);
        if frame.len() < header_len + CHECKSUM_LEN {
            return Err(DecodeError::Truncated {
                expected: header_len + CHECKSUM_LEN,
                got: frame.len(),
            });
        }

        let declared = frame[header_len - 1] as usize;
        if declared > MAX_PAYLOAD_LEN {
            return Err(DecodeError::Oversized {
                declared,
                max: MAX_PAYLOAD_LEN,
            });
        }

        let expected = header_len + declared + CHECKSUM_LEN;
        if frame.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                got: frame.len(),
            });
        }

        let (body, tail) = frame.split_at(frame.len() - CHECKSUM_LEN);
        let computed = checksum(body);
        if computed != tail[0] {
            return Err(DecodeError::ChecksumMismatch {
                computed,
                received: tail[0],
            });
        }

        if frame.len() != expected {
            return Err(DecodeError::LengthMismatch {
                declared,
                actual: frame.len() - header_len - CHECKSUM_LEN,
            });
        }

        let mut cursor = body;
        let start = cursor.get_u8();
        if start != START_DELIMITER {
            return Err(DecodeError::InvalidStart(start));
        }
        let node = cursor.get_u8();
        let kind_byte = cursor.get_u8();
        let kind = TelegramKind::from_byte(kind_byte).ok_or(DecodeError::InvalidKind(kind_byte))?;
        let status = (kind == TelegramKind::Answer).then(|| cursor.get_u8());
        let object = cursor.get_u8();
        let _length = cursor.get_u8();

        Ok(Self {
            node,
            kind,
            status,
            object,
            payload: Bytes::copy_from_slice(cursor),
        })
    }
}

/// Encodes a request for `object`.
///
/// Queries carry no payload; sends carry exactly the object's declared width.
pub fn encode(
    node: u8,
    kind: TelegramKind,
    object: &ObjectDescriptor,
    payload: &[u8],
) -> Result<Bytes, EncodeError> {
    let expected = match kind {
        TelegramKind::Query => 0,
        TelegramKind::Send | TelegramKind::Answer => object.width,
    };
    if payload.len() != expected || payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::PayloadWidthMismatch {
            object: object.number,
            expected,
            actual: payload.len(),
        });
    }

    let telegram = Telegram {
        node,
        kind,
        status: (kind == TelegramKind::Answer).then_some(0),
        object: object.number,
        payload: Bytes::copy_from_slice(payload),
    };
    Ok(telegram.encode())
}
