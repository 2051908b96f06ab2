//! Error types for the ps2000b library.

use thiserror::Error;

use crate::protocol::Access;
use crate::types::DeviceError;

/// The main error type for power supply operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the underlying byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport did not deliver the requested bytes in time.
    #[error("transport read timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The transport has not been opened or was closed.
    #[error("transport closed")]
    TransportClosed,

    /// Telegram encoding error.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Repeated framing errors on the same request.
    #[error("protocol corrupt after {attempts} attempts: {last}")]
    ProtocolCorrupt { attempts: u32, last: DecodeError },

    /// The attribute name is not in the object table.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// The attribute does not allow the requested direction.
    #[error("access denied: {attribute} is {access}")]
    AccessDenied {
        attribute: &'static str,
        access: Access,
    },

    /// A physical value cannot be represented on the wire.
    #[error("value {value} out of range {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// The value does not fit the attribute's encoding.
    #[error("invalid value for {attribute}: {reason}")]
    InvalidValue {
        attribute: &'static str,
        reason: String,
    },

    /// The answer payload does not have the width the object declares.
    #[error("unexpected payload for object 0x{object:02x}: expected {expected} bytes, got {got}")]
    UnexpectedPayload {
        object: u8,
        expected: usize,
        got: usize,
    },

    /// The device answered with an error code in its status byte.
    #[error("device rejected object 0x{object:02x}: {error}")]
    Device { object: u8, error: DeviceError },

    /// The answer cannot be attributed to the outstanding request.
    #[error(
        "desynchronized: expected node {expected_node} object 0x{expected_object:02x}, \
         got node {node} object 0x{object:02x}"
    )]
    Desynchronized {
        expected_node: u8,
        expected_object: u8,
        node: u8,
        object: u8,
    },

    /// The nominal values could not be fetched.
    #[error("calibration failed: {0}")]
    CalibrationFailed(#[source] Box<Error>),

    /// The device reported a nominal value that cannot be used for scaling.
    #[error("invalid nominal value for {attribute}: {value}")]
    InvalidNominal { attribute: &'static str, value: f64 },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// A transport is already bound to the session.
    #[error("already connected")]
    AlreadyConnected,
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The byte stream failed or timed out.
    Transport,
    /// A telegram could not be encoded or failed validation.
    Framing,
    /// The request is invalid or was refused by the device.
    Semantic,
    /// An answer did not belong to the outstanding request.
    Desynchronization,
    /// The nominal values could not be established.
    Calibration,
    /// The session is in the wrong state for the operation.
    Session,
}

impl Error {
    /// Returns the category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) | Self::Timeout { .. } | Self::TransportClosed => ErrorCategory::Transport,
            Self::Encode(_) | Self::ProtocolCorrupt { .. } => ErrorCategory::Framing,
            Self::UnknownAttribute(_)
            | Self::AccessDenied { .. }
            | Self::OutOfRange { .. }
            | Self::InvalidValue { .. }
            | Self::UnexpectedPayload { .. }
            | Self::Device { .. } => ErrorCategory::Semantic,
            Self::Desynchronized { .. } => ErrorCategory::Desynchronization,
            Self::CalibrationFailed(_) | Self::InvalidNominal { .. } => ErrorCategory::Calibration,
            Self::NotConnected | Self::AlreadyConnected => ErrorCategory::Session,
        }
    }

    pub(crate) fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Errors raised while building a telegram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Payload length disagrees with the object's declared width.
    #[error("payload width mismatch for object 0x{object:02x}: expected {expected} bytes, got {actual}")]
    PayloadWidthMismatch {
        object: u8,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while validating a received frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes than the header or the declared length require.
    #[error("truncated frame: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// The additive checksum does not match.
    #[error("checksum mismatch: computed 0x{computed:02x}, received 0x{received:02x}")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// More bytes than the declared length accounts for.
    #[error("length mismatch: declared {declared} payload bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Declared payload length above the protocol maximum.
    #[error("declared payload of {declared} bytes exceeds maximum {max}")]
    Oversized { declared: usize, max: usize },

    /// The first byte is not the start delimiter.
    #[error("invalid start delimiter 0x{0:02x}")]
    InvalidStart(u8),

    /// The telegram type byte is not known.
    #[error("invalid telegram type 0x{0:02x}")]
    InvalidKind(u8),

    /// A well-formed telegram of the wrong type where an answer was expected.
    #[error("expected an answer telegram, got type 0x{0:02x}")]
    NotAnAnswer(u8),
}

/// Result type alias for ps2000b operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            Error::timeout(std::time::Duration::from_millis(200)).category(),
            ErrorCategory::Transport
        );
        assert_eq!(
            Error::ProtocolCorrupt {
                attempts: 2,
                last: DecodeError::InvalidStart(0),
            }
            .category(),
            ErrorCategory::Framing
        );
        assert_eq!(
            Error::Device {
                object: 0x0d,
                error: DeviceError::NoWriteAccess,
            }
            .category(),
            ErrorCategory::Semantic
        );
        assert_eq!(
            Error::CalibrationFailed(Box::new(Error::NotConnected)).category(),
            ErrorCategory::Calibration
        );
        assert_eq!(Error::NotConnected.category(), ErrorCategory::Session);
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::timeout(std::time::Duration::from_millis(250));
        assert_eq!(err.to_string(), "transport read timed out after 250ms");
    }

    #[test]
    fn test_out_of_range_message() {
        let err = Error::OutOfRange {
            value: -12.5,
            min: -10.0,
            max: 10.0,
        };
        assert_eq!(err.to_string(), "value -12.5 out of range -10..=10");
        assert_eq!(err.category(), ErrorCategory::Semantic);
    }
}
