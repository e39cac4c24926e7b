//! Core discovery logic and iterator implementation.
//!
//! A discovery pass:
//! 1. Clears the roster
//! 2. Broadcasts `GetService` and collects one `StateService` per device
//! 3. Queries each new device's product and classifies it
//! 4. Appends it to the roster and yields it
//!
//! Only one pass may run against a roster at a time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lifx_exchange::{BroadcastCollector, ExchangeConfig, ExchangeEngine, Reply};
use lifx_protocol::{BuiltinCatalog, MessageType, Payload, ProductCatalog};
use parking_lot::Mutex;

use crate::device::{ClassificationFallback, Classifier, DiscoveredDevice, ProvisionalDevice};
use crate::error::{DiscoveryError, Result};
use crate::roster::Roster;
use crate::DeviceEvent;

/// Owns the roster and runs discovery passes over an exchange engine.
#[derive(Debug, Clone)]
pub struct Discoverer {
    engine: Arc<ExchangeEngine>,
    classifier: Classifier,
    roster: Arc<Mutex<Roster>>,
    refreshing: Arc<AtomicBool>,
}

impl Discoverer {
    /// Discoverer with the built-in product catalog and the light fallback
    pub fn new(engine: Arc<ExchangeEngine>) -> Self {
        Self::with_catalog(engine, Arc::new(BuiltinCatalog), ClassificationFallback::default())
    }

    /// Discoverer over real UDP sockets
    pub fn with_config(config: ExchangeConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(ExchangeEngine::new(config)?)))
    }

    pub fn with_catalog(
        engine: Arc<ExchangeEngine>,
        catalog: Arc<dyn ProductCatalog>,
        fallback: ClassificationFallback,
    ) -> Self {
        Self {
            classifier: Classifier::new(Arc::clone(&engine), catalog, fallback),
            engine,
            roster: Arc::new(Mutex::new(Roster::new())),
            refreshing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn engine(&self) -> &Arc<ExchangeEngine> {
        &self.engine
    }

    /// Start a discovery pass.
    ///
    /// The roster is cleared before this returns and refilled as the
    /// iterator is consumed. The pass ends when the broadcast budget runs out
    /// (or the configured device count has answered) or when the iterator
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::InProgress` if another pass is still
    /// running, or the exchange error if the socket cannot be opened.
    pub fn discover(&self) -> Result<DiscoveryIterator> {
        let guard = RefreshGuard::acquire(&self.refreshing)?;
        let config = self.engine.config();
        let collector = self.engine.broadcast_collector(
            Payload::GetService,
            MessageType::StateService,
            config.broadcast(),
            config.expected_devices,
        )?;

        self.roster.lock().clear();
        tracing::debug!("Discovery pass started");

        Ok(DiscoveryIterator {
            pass: Some(Pass {
                collector,
                classifier: self.classifier.clone(),
                roster: Arc::clone(&self.roster),
                found: 0,
                _guard: guard,
            }),
        })
    }

    /// Run a full pass and return what it found
    pub fn discover_all(&self) -> Result<Vec<DiscoveredDevice>> {
        Ok(self
            .discover()?
            .map(|event| match event {
                DeviceEvent::Found(device) => device,
            })
            .collect())
    }

    /// Snapshot of the roster
    pub fn roster(&self) -> Roster {
        self.roster.lock().clone()
    }

    pub fn devices(&self) -> Vec<DiscoveredDevice> {
        self.roster.lock().devices().to_vec()
    }

    pub fn lights(&self) -> Vec<DiscoveredDevice> {
        self.roster.lock().lights().to_vec()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }
}

/// Marks a pass as running; cleared on drop.
#[derive(Debug)]
struct RefreshGuard {
    flag: Arc<AtomicBool>,
}

impl RefreshGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DiscoveryError::InProgress)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct Pass {
    collector: BroadcastCollector,
    classifier: Classifier,
    roster: Arc<Mutex<Roster>>,
    found: usize,
    _guard: RefreshGuard,
}

/// Iterator over the devices found by one discovery pass.
///
/// Yields `DeviceEvent::Found` for each device as soon as it has been
/// classified. A pass cannot be restarted; call
/// [`Discoverer::discover`] again for a fresh one.
///
/// # Examples
///
/// ```no_run
/// use lifx_discovery::{get_iter, DeviceEvent};
///
/// for event in get_iter() {
///     match event {
///         DeviceEvent::Found(device) => {
///             println!("Found: {} ({:?})", device.mac, device.role);
///         }
///     }
/// }
/// ```
pub struct DiscoveryIterator {
    pass: Option<Pass>,
}

impl DiscoveryIterator {
    /// Create an empty iterator that yields no results
    /// Used as a fallback when a pass cannot be started
    pub(crate) fn empty() -> Self {
        Self { pass: None }
    }

    fn finish(&mut self) {
        if let Some(pass) = self.pass.take() {
            tracing::debug!("Discovery pass finished: {} device(s)", pass.found);
        }
    }
}

impl Iterator for DiscoveryIterator {
    type Item = DeviceEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let pass = self.pass.as_mut()?;
        let reply = match pass.collector.next() {
            Some(Ok(reply)) => reply,
            Some(Err(e)) => {
                tracing::warn!("Discovery pass aborted: {}", e);
                self.finish();
                return None;
            }
            None => {
                self.finish();
                return None;
            }
        };

        let device = pass.classifier.classify(provisional(&reply));
        tracing::debug!(
            "Discovered {} at {} as {:?}",
            device.mac,
            device.addr,
            device.role
        );
        pass.roster.lock().push(device.clone());
        pass.found += 1;
        Some(DeviceEvent::Found(device))
    }
}

fn provisional(reply: &Reply) -> ProvisionalDevice {
    let (service, port) = match reply.payload() {
        Payload::StateService { service, port } => (*service, *port),
        _ => (0, 0),
    };
    // Later exchanges go to the advertised port on the address that answered
    let addr = match u16::try_from(port) {
        Ok(port) if port != 0 => SocketAddr::new(reply.from.ip(), port),
        _ => reply.from,
    };
    ProvisionalDevice {
        mac: reply.origin(),
        addr,
        service,
        port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifx_protocol::{HardwareAddress, Message};

    fn state_service(port: u32) -> Reply {
        Reply {
            message: Message::new(Payload::StateService { service: 1, port })
                .with_target(HardwareAddress::new([1, 2, 3, 4, 5, 6])),
            from: SocketAddr::from(([10, 0, 0, 9], 56700)),
        }
    }

    #[test]
    fn test_provisional_uses_advertised_port() {
        let device = provisional(&state_service(56701));
        assert_eq!(device.addr, SocketAddr::from(([10, 0, 0, 9], 56701)));
        assert_eq!(device.mac, HardwareAddress::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(device.service, 1);
    }

    #[test]
    fn test_provisional_ignores_unusable_port() {
        assert_eq!(provisional(&state_service(0)).addr.port(), 56700);
        assert_eq!(provisional(&state_service(70_000)).addr.port(), 56700);
    }

    #[test]
    fn test_refresh_guard_is_exclusive() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = RefreshGuard::acquire(&flag).unwrap();
        assert!(matches!(
            RefreshGuard::acquire(&flag),
            Err(DiscoveryError::InProgress)
        ));
        drop(guard);
        assert!(RefreshGuard::acquire(&flag).is_ok());
    }
}
