//! Error types for the LIFX protocol layer.

use thiserror::Error;

use crate::message::MessageType;

/// Failure to turn a received datagram into a [`Message`](crate::Message).
///
/// Every variant means "this datagram is not something we can use". The
/// exchange engine treats all of them the same way: log and keep waiting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Fewer bytes than the fixed header, or than the header claims
    #[error("Datagram truncated: got {actual} bytes, need {needed}")]
    Truncated { actual: usize, needed: usize },

    /// The size field disagrees with the datagram length
    #[error("Declared size {declared} does not match datagram length {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    /// Protocol number other than 1024
    #[error("Unsupported protocol number {0}")]
    UnsupportedProtocol(u16),

    /// Message type code this codec does not know
    #[error("Unknown message type {0}")]
    UnknownType(u16),

    /// Payload length does not fit the message type
    #[error("Payload for {kind} is {actual} bytes, expected {expected}")]
    PayloadSize {
        kind: MessageType,
        expected: usize,
        actual: usize,
    },

    /// A payload field holds a value outside its domain
    #[error("Invalid {field} in {kind} payload: {value}")]
    InvalidField {
        kind: MessageType,
        field: &'static str,
        value: String,
    },
}

/// Errors raised while building protocol values.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A datagram could not be decoded
    #[error("Malformed message: {0}")]
    Malformed(#[from] CodecError),

    /// Caller supplied a value outside the protocol's accepted domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ProtocolError {
    pub fn invalid_parameter(parameter: &str, value: impl std::fmt::Display) -> Self {
        Self::InvalidParameter(format!("'{}' is not a valid {}", value, parameter))
    }
}

/// Convenience Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
