use lifx_discovery::DiscoveryError;
use lifx_exchange::ExchangeError;
use lifx_protocol::{HardwareAddress, MessageType, ProtocolError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Device {0} is not a light")]
    NotALight(HardwareAddress),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unexpected reply {0}")]
    UnexpectedReply(MessageType),
}

impl SdkError {
    /// True when the device never answered within the attempt budget
    pub fn is_no_response(&self) -> bool {
        match self {
            SdkError::Exchange(e) => e.is_no_response(),
            SdkError::Discovery(DiscoveryError::Exchange(e)) => e.is_no_response(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;
