//! Error types for the exchange engine

use lifx_protocol::{HardwareAddress, MessageType};
use thiserror::Error;

/// Errors that can occur while exchanging messages with devices
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Every attempt ran out without an accepted reply
    #[error("no {} reply to {request} from {target}", type_list(.expected))]
    NoResponse {
        request: MessageType,
        expected: Vec<MessageType>,
        target: HardwareAddress,
    },

    /// Rejected before any traffic was sent
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The UDP socket could not be created or configured
    #[error("Failed to open socket: {0}")]
    SocketOpen(#[source] std::io::Error),

    /// Sending or receiving failed for a reason other than a timeout
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),
}

impl ExchangeError {
    pub fn is_no_response(&self) -> bool {
        matches!(self, ExchangeError::NoResponse { .. })
    }
}

fn type_list(types: &[MessageType]) -> String {
    types
        .iter()
        .map(|kind| kind.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
