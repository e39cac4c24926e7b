//! Per-client session identifier.

use std::fmt;

use crate::error::{ExchangeError, Result};

/// Random `source` value stamped on every outgoing message.
///
/// Devices echo it back, which is how an exchange tells its own replies
/// apart from traffic belonging to other clients on the same network.
/// Values 0 and 1 are reserved by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u32);

impl SessionId {
    pub const MIN: u32 = 2;

    pub fn random() -> Self {
        Self(fastrand::u32(Self::MIN..=u32::MAX))
    }

    pub fn new(value: u32) -> Result<Self> {
        if value < Self::MIN {
            return Err(ExchangeError::InvalidParameter(format!(
                "session id {} is reserved, must be at least {}",
                value,
                Self::MIN
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
