//! Request/response exchanges with LIFX devices over UDP
//!
//! UDP gives no delivery or ordering guarantees, so every exchange here is a
//! small retry/timeout state machine: send, receive until a reply that
//! belongs to this exchange arrives or the attempt runs out, retransmit.
//! Replies are correlated by type, session id and originating device.
//!
//! # Example
//!
//! ```no_run
//! use lifx_exchange::{ExchangeConfig, ExchangeEngine};
//! use lifx_protocol::{MessageType, Payload};
//!
//! let engine = ExchangeEngine::new(ExchangeConfig::default())?;
//! let replies = engine.broadcast_collect(
//!     Payload::GetService,
//!     MessageType::StateService,
//!     engine.config().broadcast(),
//!     None,
//! )?;
//! for reply in replies {
//!     println!("{} at {}", reply.origin(), reply.from);
//! }
//! # Ok::<(), lifx_exchange::ExchangeError>(())
//! ```

mod broadcast;
pub mod config;
mod error;
pub mod exchange;
pub mod matcher;
mod session;
pub mod testing;
pub mod transport;

pub use broadcast::broadcast_addresses;
pub use config::{ExchangeConfig, ExchangeOptions};
pub use error::{ExchangeError, Result};
pub use exchange::{BroadcastCollector, ExchangeEngine, Reply, SendReport, Target};
pub use matcher::{Matcher, Rejection, TargetPolicy};
pub use session::SessionId;
pub use transport::{DatagramSocket, Received, Transport, UdpTransport};
