//! LIFX LAN protocol types
//!
//! This crate provides the message vocabulary the rest of the workspace speaks:
//! typed messages, the binary header codec and the product catalog used to
//! classify devices. It performs no I/O.
//!
//! # Quick Start
//!
//! ```
//! use lifx_protocol::{Codec, HardwareAddress, LanCodec, Message, Payload};
//!
//! let target: HardwareAddress = "d0:73:d5:01:02:03".parse().unwrap();
//! let request = Message::new(Payload::GetPower)
//!     .with_source(42)
//!     .with_target(target)
//!     .with_res_required(true);
//!
//! let bytes = LanCodec.encode(&request);
//! let decoded = LanCodec.decode(&bytes).unwrap();
//! assert_eq!(decoded, request);
//! ```

pub mod codec;
mod error;
pub mod header;
pub mod message;
pub mod products;
pub mod types;

pub use codec::{truncate_label, Codec, LanCodec};
pub use error::{CodecError, ProtocolError, Result};
pub use message::{Message, MessageType, Payload, LABEL_SIZE, SERVICE_UDP};
pub use products::{BuiltinCatalog, Features, ProductCatalog};
pub use types::{FirmwareVersion, HardwareAddress, Hsbk, Power, Waveform};

/// Default UDP port LIFX devices listen on
pub const DEFAULT_PORT: u16 = 56700;
