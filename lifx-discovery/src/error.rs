//! Error types for the discovery system.

use lifx_exchange::ExchangeError;
use thiserror::Error;

/// Error type for discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Another pass is still running against the same roster
    #[error("a discovery pass is already in progress")]
    InProgress,

    /// The broadcast exchange could not be started
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
