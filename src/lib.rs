//! # ps2000b
//!
//! A Rust driver for bench power supplies speaking the PS 2000 B telegram
//! protocol.
//!
//! The library encodes and validates telegrams, maps attribute names to
//! device objects, scales voltages and currents against the device's nominal
//! values and runs one request/answer exchange at a time over any async byte
//! stream.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Checksummed, length-validated telegram codec
//! - Lazy calibration from the device's nominal values
//! - Categorized errors with automatic disconnect on desynchronization
//!
//! ## Quick Start
//!
//! ```no_run
//! use ps2000b::{PowerSupply, SessionConfig, StreamTransport};
//!
//! # async fn run(port: tokio::io::DuplexStream) -> Result<(), ps2000b::Error> {
//! // `port` is any already-open AsyncRead + AsyncWrite stream, e.g. a
//! // serial port opened at 115200 baud, 8 data bits, odd parity.
//! let psu = PowerSupply::new(SessionConfig::default());
//! let info = psu.open(StreamTransport::new(port)).await?;
//! println!("Connected to: {info}");
//!
//! psu.set_remote_control(true).await?;
//! psu.set_voltage(5.1).await?;
//! psu.set_output(true).await?;
//! println!("Output: {:.3} V", psu.measured_voltage().await?);
//!
//! psu.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Telegram codec, object table, scaling and payloads
//! - [`types`] - Values, status and device information
//! - [`transport`] - Byte stream abstraction and stream adapter
//! - [`session`] - Request/answer sequencing and calibration
//! - [`client`] - High-level [`PowerSupply`] client

pub mod client;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::PowerSupply;
pub use error::{DecodeError, EncodeError, Error, ErrorCategory, Result};
pub use protocol::{Access, Attribute, ObjectDescriptor, Telegram, TelegramKind, describe};
pub use session::{Reply, Session, SessionConfig, SessionState};
pub use transport::{StreamTransport, Transport};
pub use types::{
    Calibration, DeviceError, DeviceInformation, DeviceStatus, OperatingState, RegulationMode,
    Value,
};
