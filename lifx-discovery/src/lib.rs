//! LIFX device discovery library
//!
//! This crate finds LIFX devices on the local network by broadcasting
//! `GetService`, then asks each responder for its product id to decide
//! whether it is a light and what kind.
//!
//! # Quick Start
//!
//! ```no_run
//! use lifx_discovery::get;
//!
//! // Discover all LIFX devices on the network
//! let devices = get();
//! for device in devices {
//!     println!("Found {} at {} ({:?})", device.mac, device.addr, device.role);
//! }
//! ```
//!
//! # Keeping a roster
//!
//! A [`Discoverer`] remembers what its latest pass found. Each pass clears
//! and rebuilds the roster, so devices that went away are dropped:
//!
//! ```no_run
//! use lifx_discovery::Discoverer;
//! use lifx_exchange::ExchangeConfig;
//!
//! let discoverer = Discoverer::with_config(ExchangeConfig::default())?;
//! discoverer.discover_all()?;
//! println!("{} lights", discoverer.lights().len());
//! # Ok::<(), lifx_discovery::DiscoveryError>(())
//! ```

pub mod device;
mod discovery;
mod error;
pub mod roster;

pub use device::{ClassificationFallback, Classifier, DeviceRole, DiscoveredDevice, ProductVersion};
pub use discovery::{Discoverer, DiscoveryIterator};
pub use error::{DiscoveryError, Result};
pub use roster::Roster;

use lifx_exchange::ExchangeConfig;

/// Events emitted during device discovery.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A device answered and has been classified
    Found(DiscoveredDevice),
}

/// Discover all LIFX devices on the local network with the default
/// configuration.
///
/// This is a convenience function that collects all discovered devices into a Vec.
/// For more control over the discovery process, use `get_iter()` instead.
pub fn get() -> Vec<DiscoveredDevice> {
    get_with_config(ExchangeConfig::default())
}

/// Discover all LIFX devices with a custom exchange configuration.
///
/// # Examples
///
/// ```no_run
/// use lifx_discovery::get_with_config;
/// use lifx_exchange::ExchangeConfig;
/// use std::time::Duration;
///
/// let config = ExchangeConfig::default().with_timeout(Duration::from_millis(500));
/// for device in get_with_config(config) {
///     println!("Found: {} at {}", device.mac, device.addr);
/// }
/// ```
pub fn get_with_config(config: ExchangeConfig) -> Vec<DiscoveredDevice> {
    get_iter_with_config(config)
        .map(|event| match event {
            DeviceEvent::Found(device) => device,
        })
        .collect()
}

/// Get an iterator for discovering LIFX devices with the default
/// configuration.
pub fn get_iter() -> DiscoveryIterator {
    get_iter_with_config(ExchangeConfig::default())
}

/// Get an iterator for discovering LIFX devices with a custom configuration.
///
/// If the pass cannot be started (invalid configuration, socket failure)
/// the iterator is empty.
pub fn get_iter_with_config(config: ExchangeConfig) -> DiscoveryIterator {
    match Discoverer::with_config(config).and_then(|discoverer| discoverer.discover()) {
        Ok(iter) => iter,
        Err(e) => {
            tracing::warn!("Discovery could not start: {}", e);
            DiscoveryIterator::empty()
        }
    }
}
