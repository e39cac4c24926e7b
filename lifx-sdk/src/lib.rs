//! # LIFX SDK - blocking control of LIFX lights over the LAN
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use lifx_sdk::{LifxLan, Power};
//!
//! fn main() -> Result<(), lifx_sdk::SdkError> {
//!     let lifx = LifxLan::new()?;
//!     lifx.discover()?;
//!
//!     let desk = lifx.get_device_by_name("Desk")?;
//!     println!("{} is {}", desk, desk.get_power()?);
//!
//!     lifx.set_power_all_lights(Power::On, Duration::from_secs(1), false)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Access patterns
//!
//! - `get_*()` asks the device and caches the answer
//! - the plain accessor (`label()`, `power()`, ...) returns the cache with the
//!   time it was read
//! - setters take a `rapid` flag choosing between an acknowledged send and
//!   an unacknowledged burst
//!
//! ## Architecture
//!
//! ```text
//! lifx-sdk (LifxLan, Device, Group)
//!     ↓
//! lifx-discovery (broadcast discovery, classification, roster)
//!     ↓
//! lifx-exchange (request/response, fire-and-forget, broadcast collect)
//!     ↓
//! lifx-protocol (message types, binary codec, product catalog)
//! ```

mod device;
mod error;
mod group;
pub mod logging;
pub mod property;
mod system;
mod waveform;

pub use device::Device;
pub use error::{Result, SdkError};
pub use group::Group;
pub use property::{Cached, Membership};
pub use system::LifxLan;
pub use waveform::WaveformEffect;

// Re-export the types callers need to build requests and read results
pub use lifx_discovery::{ClassificationFallback, DeviceRole, ProductVersion};
pub use lifx_exchange::ExchangeConfig;
pub use lifx_protocol::{Features, FirmwareVersion, HardwareAddress, Hsbk, Power, Waveform};
