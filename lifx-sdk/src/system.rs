//! LifxLan - main entry point for the SDK
//!
//! Provides device discovery, lookup by label, group or location, and
//! broadcast commands addressed to every light at once.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use lifx_discovery::{ClassificationFallback, Discoverer};
use lifx_exchange::{ExchangeConfig, ExchangeEngine, Reply};
use lifx_protocol::{BuiltinCatalog, Hsbk, MessageType, Payload, Power, ProductCatalog};
use parking_lot::RwLock;

use crate::device::Device;
use crate::error::{Result, SdkError};
use crate::group::{fan_out, Group};
use crate::waveform::{duration_millis, WaveformEffect};

/// Main entry point for the SDK
///
/// Owns one exchange engine (one session id) and the device handles found by
/// the latest discovery pass.
///
/// # Example
///
/// ```rust,ignore
/// let lifx = LifxLan::new()?;
/// for light in lifx.discover()?.iter().filter(|d| d.is_light()) {
///     println!("{}: {}", light.mac(), light.get_label()?);
/// }
///
/// lifx.set_power_all_lights(Power::On, Duration::from_secs(1), false)?;
/// ```
pub struct LifxLan {
    engine: Arc<ExchangeEngine>,
    catalog: Arc<dyn ProductCatalog>,
    discoverer: Discoverer,
    devices: RwLock<Vec<Device>>,
}

impl LifxLan {
    /// Client with the default configuration over real UDP sockets
    pub fn new() -> Result<Self> {
        Self::with_config(ExchangeConfig::default())
    }

    /// Client with a custom configuration over real UDP sockets.
    ///
    /// Fails with `InvalidParameter` before any socket is opened if the
    /// configuration does not validate.
    pub fn with_config(config: ExchangeConfig) -> Result<Self> {
        Ok(Self::with_engine(Arc::new(ExchangeEngine::new(config)?)))
    }

    /// Client over an existing engine, e.g. one built on a simulated
    /// transport
    pub fn with_engine(engine: Arc<ExchangeEngine>) -> Self {
        Self::with_catalog(engine, Arc::new(BuiltinCatalog), ClassificationFallback::default())
    }

    pub fn with_catalog(
        engine: Arc<ExchangeEngine>,
        catalog: Arc<dyn ProductCatalog>,
        fallback: ClassificationFallback,
    ) -> Self {
        Self {
            discoverer: Discoverer::with_catalog(Arc::clone(&engine), Arc::clone(&catalog), fallback),
            engine,
            catalog,
            devices: RwLock::new(Vec::new()),
        }
    }

    pub fn engine(&self) -> &Arc<ExchangeEngine> {
        &self.engine
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Run a discovery pass and replace the device list with its result.
    ///
    /// Handles for devices seen before are reused, so their caches survive
    /// the pass.
    pub fn discover(&self) -> Result<Vec<Device>> {
        let found = self.discoverer.discover_all()?;

        let mut devices = self.devices.write();
        let refreshed: Vec<Device> = found
            .iter()
            .map(|discovered| {
                match devices
                    .iter()
                    .find(|d| d.mac() == discovered.mac && d.role() == discovered.role)
                {
                    Some(existing) => {
                        existing.observe(discovered.addr);
                        existing.clone()
                    }
                    None => Device::from_discovered(
                        discovered,
                        Arc::clone(&self.engine),
                        Arc::clone(&self.catalog),
                    ),
                }
            })
            .collect();
        *devices = refreshed.clone();

        tracing::info!("Discovered {} device(s)", refreshed.len());
        Ok(refreshed)
    }

    /// Devices from the latest discovery pass, without network traffic
    pub fn devices(&self) -> Vec<Device> {
        self.devices.read().clone()
    }

    /// Lights from the latest discovery pass, without network traffic
    pub fn lights(&self) -> Vec<Device> {
        self.devices
            .read()
            .iter()
            .filter(|device| device.is_light())
            .cloned()
            .collect()
    }

    /// Known devices, discovering first if none are known yet
    fn known_devices(&self) -> Result<Vec<Device>> {
        let devices = self.devices();
        if devices.is_empty() {
            return self.discover();
        }
        Ok(devices)
    }

    fn known_lights(&self) -> Result<Vec<Device>> {
        Ok(self
            .known_devices()?
            .into_iter()
            .filter(|device| device.is_light())
            .collect())
    }

    pub fn get_multizone_lights(&self) -> Result<Vec<Device>> {
        self.lights_where(Device::supports_multizone)
    }

    pub fn get_infrared_lights(&self) -> Result<Vec<Device>> {
        self.lights_where(Device::supports_infrared)
    }

    pub fn get_color_lights(&self) -> Result<Vec<Device>> {
        self.lights_where(Device::supports_color)
    }

    pub fn get_chain_lights(&self) -> Result<Vec<Device>> {
        self.lights_where(Device::supports_chain)
    }

    fn lights_where(&self, supports: fn(&Device) -> Result<bool>) -> Result<Vec<Device>> {
        let mut matching = Vec::new();
        for light in self.known_lights()? {
            if supports(&light)? {
                matching.push(light);
            }
        }
        Ok(matching)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Find a device by label.
    ///
    /// Labels are read from every known device. If none matches, one new
    /// discovery pass runs and the search is repeated.
    pub fn get_device_by_name(&self, name: &str) -> Result<Device> {
        let found = self.find_by_label(&self.known_devices()?, |label| label == name);
        if let Some(device) = found.into_iter().next() {
            return Ok(device);
        }

        tracing::debug!("No device labelled {:?}, rediscovering", name);
        self.find_by_label(&self.discover()?, |label| label == name)
            .into_iter()
            .next()
            .ok_or_else(|| SdkError::DeviceNotFound(name.to_string()))
    }

    /// Every device whose label is one of `names`, rediscovering once if any
    /// name is missing
    pub fn get_devices_by_names(&self, names: &[&str]) -> Result<Group> {
        let wanted: HashSet<&str> = names.iter().copied().collect();

        let found = self.find_by_label(&self.known_devices()?, |label| wanted.contains(label));
        let labels: HashSet<String> = found
            .iter()
            .filter_map(|device| device.label().map(|cached| cached.value))
            .collect();
        if labels.len() == wanted.len() {
            return Ok(Group::new(found));
        }

        tracing::debug!(
            "Found {} of {} names, rediscovering",
            labels.len(),
            wanted.len()
        );
        Ok(Group::new(
            self.find_by_label(&self.discover()?, |label| wanted.contains(label)),
        ))
    }

    /// Every known device whose group label is `group`
    pub fn get_devices_by_group(&self, group: &str) -> Result<Group> {
        let devices = self.known_devices()?;
        let groups = fan_out(&devices, Device::get_group);
        Ok(select(devices, groups, |label| label == group))
    }

    /// Every known device whose location label is `location`
    pub fn get_devices_by_location(&self, location: &str) -> Result<Group> {
        let devices = self.known_devices()?;
        let locations = fan_out(&devices, Device::get_location);
        Ok(select(devices, locations, |label| label == location))
    }

    fn find_by_label(&self, devices: &[Device], wanted: impl Fn(&str) -> bool) -> Vec<Device> {
        let labels = fan_out(devices, Device::get_label);
        select(devices.to_vec(), labels, wanted).devices().to_vec()
    }

    // ========================================================================
    // All lights
    // ========================================================================

    /// Power of every known light that answered a broadcast `LightGetPower`
    pub fn get_power_all_lights(&self) -> Result<Vec<(Device, Power)>> {
        let lights = self.known_lights()?;
        let replies = self.collect(Payload::LightGetPower, MessageType::LightStatePower)?;
        Ok(match_replies(&lights, &replies, |payload| match payload {
            Payload::LightStatePower { level } => Some(Power::from_reported_level(*level)),
            _ => None,
        }))
    }

    pub fn set_power_all_lights(&self, power: Power, duration: Duration, rapid: bool) -> Result<()> {
        let payload = Payload::LightSetPower {
            level: power.level(),
            duration: duration_millis(duration, "duration")?,
        };
        self.broadcast(payload, rapid)
    }

    /// Color of every known light that answered a broadcast `LightGet`
    pub fn get_color_all_lights(&self) -> Result<Vec<(Device, Hsbk)>> {
        let lights = self.known_lights()?;
        let replies = self.collect(Payload::LightGet, MessageType::LightState)?;
        Ok(match_replies(&lights, &replies, |payload| match payload {
            Payload::LightState { color, .. } => Some(*color),
            _ => None,
        }))
    }

    pub fn set_color_all_lights(&self, color: Hsbk, duration: Duration, rapid: bool) -> Result<()> {
        color.validate()?;
        let payload = Payload::LightSetColor {
            color,
            duration: duration_millis(duration, "duration")?,
        };
        self.broadcast(payload, rapid)
    }

    pub fn set_waveform_all_lights(&self, effect: &WaveformEffect, rapid: bool) -> Result<()> {
        self.broadcast(effect.to_payload()?, rapid)
    }

    fn collect(&self, payload: Payload, expected: MessageType) -> Result<Vec<Reply>> {
        let config = self.engine.config();
        Ok(self.engine.broadcast_collect(
            payload,
            expected,
            config.broadcast(),
            config.expected_devices,
        )?)
    }

    /// One unacknowledged broadcast when `rapid`, otherwise a broadcast that
    /// collects acknowledgements
    fn broadcast(&self, payload: Payload, rapid: bool) -> Result<()> {
        let config = self.engine.config();
        if rapid {
            self.engine
                .broadcast_fire_and_forget(payload, 1, config.burst_interval)?;
        } else {
            let acks = self
                .engine
                .broadcast_with_ack(payload, config.expected_devices)?;
            tracing::debug!("{} device(s) acknowledged", acks.len());
        }
        Ok(())
    }
}

/// Keep the devices whose looked-up label satisfies `wanted`. Devices that
/// did not answer are left out.
fn select(
    devices: Vec<Device>,
    labels: Vec<Result<String>>,
    wanted: impl Fn(&str) -> bool,
) -> Group {
    devices
        .into_iter()
        .zip(labels)
        .filter_map(|(device, label)| match label {
            Ok(label) if wanted(&label) => Some(device),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", device.mac(), e);
                None
            }
        })
        .collect()
}

/// Pair each light with the value from its own reply. Lights without a
/// reply, and replies from devices not in `lights`, are dropped.
fn match_replies<T>(
    lights: &[Device],
    replies: &[Reply],
    value: impl Fn(&Payload) -> Option<T>,
) -> Vec<(Device, T)> {
    lights
        .iter()
        .filter_map(|light| {
            let reply = replies.iter().find(|reply| reply.origin() == light.mac())?;
            let value = value(reply.payload())?;
            light.observe(reply.from);
            Some((light.clone(), value))
        })
        .collect()
}

impl std::fmt::Debug for LifxLan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifxLan")
            .field("engine", &self.engine)
            .field("devices", &self.devices.read().len())
            .finish_non_exhaustive()
    }
}
