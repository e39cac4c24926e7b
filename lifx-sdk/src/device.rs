//! Device handle
//!
//! A [`Device`] is a cheap, cloneable handle on one LIFX device. Clones share
//! the remembered address and the attribute cache, so a value read through
//! one clone is visible through all of them.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lifx_discovery::{DeviceRole, DiscoveredDevice, ProductVersion};
use lifx_exchange::{ExchangeEngine, Target};
use lifx_protocol::{
    truncate_label, BuiltinCatalog, Features, FirmwareVersion, HardwareAddress, Hsbk, MessageType,
    Payload, Power, ProductCatalog,
};
use parking_lot::RwLock;

use crate::error::{Result, SdkError};
use crate::property::{Cached, Membership};
use crate::waveform::{duration_millis, WaveformEffect};

/// Handle on one device
///
/// Every `get_*` method performs a request/response exchange and caches the
/// answer; the plain accessors (`label()`, `power()`, ...) return that cache
/// without touching the network. Setters take a `rapid` flag: `false` waits
/// for an acknowledgement, `true` sends without waiting for anything.
///
/// # Example
///
/// ```rust,ignore
/// let label = device.get_label()?;
/// device.set_power(Power::On, false)?;
///
/// // Later, without network traffic
/// if let Some(power) = device.power() {
///     println!("{} was {} {:?} ago", label, power.value, power.age());
/// }
/// ```
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    mac: HardwareAddress,
    role: DeviceRole,
    engine: Arc<ExchangeEngine>,
    catalog: Arc<dyn ProductCatalog>,
    state: RwLock<DeviceState>,
}

#[derive(Default)]
struct DeviceState {
    addr: Option<SocketAddr>,
    label: Option<Cached<String>>,
    location: Option<Cached<Membership>>,
    group: Option<Cached<Membership>>,
    power: Option<Cached<Power>>,
    color: Option<Cached<Hsbk>>,
    host_firmware: Option<Cached<(u64, FirmwareVersion)>>,
    wifi_firmware: Option<Cached<(u64, FirmwareVersion)>>,
    version: Option<Cached<ProductVersion>>,
}

impl Device {
    /// Handle on a device known by hardware address.
    ///
    /// With `addr` unset the first request is broadcast; the address of the
    /// first reply is remembered for later requests.
    pub fn new(
        mac: HardwareAddress,
        addr: Option<SocketAddr>,
        role: DeviceRole,
        engine: Arc<ExchangeEngine>,
    ) -> Self {
        Self::with_catalog(mac, addr, role, engine, Arc::new(BuiltinCatalog))
    }

    pub fn with_catalog(
        mac: HardwareAddress,
        addr: Option<SocketAddr>,
        role: DeviceRole,
        engine: Arc<ExchangeEngine>,
        catalog: Arc<dyn ProductCatalog>,
    ) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                mac,
                role,
                engine,
                catalog,
                state: RwLock::new(DeviceState {
                    addr,
                    ..DeviceState::default()
                }),
            }),
        }
    }

    /// Handle on a device found by discovery, seeded with its product
    /// version when the classification query succeeded.
    pub(crate) fn from_discovered(
        device: &DiscoveredDevice,
        engine: Arc<ExchangeEngine>,
        catalog: Arc<dyn ProductCatalog>,
    ) -> Self {
        let handle = Self::with_catalog(device.mac, Some(device.addr), device.role, engine, catalog);
        if let Some(version) = device.version {
            handle.inner.state.write().version = Some(Cached::new(version));
        }
        handle
    }

    pub fn mac(&self) -> HardwareAddress {
        self.inner.mac
    }

    pub fn role(&self) -> DeviceRole {
        self.inner.role
    }

    pub fn is_light(&self) -> bool {
        self.inner.role.is_light()
    }

    /// Address of the last reply, if any
    pub fn addr(&self) -> Option<SocketAddr> {
        self.inner.state.read().addr
    }

    pub fn target(&self) -> Target {
        Target::device(self.inner.mac, self.addr())
    }

    /// Remember the address a valid reply came from
    pub(crate) fn observe(&self, from: SocketAddr) {
        let mut state = self.inner.state.write();
        if state.addr != Some(from) {
            tracing::debug!("{} now at {}", self.inner.mac, from);
            state.addr = Some(from);
        }
    }

    // ========================================================================
    // Cached values
    // ========================================================================

    pub fn label(&self) -> Option<Cached<String>> {
        self.inner.state.read().label.clone()
    }

    pub fn location(&self) -> Option<Cached<Membership>> {
        self.inner.state.read().location.clone()
    }

    pub fn group(&self) -> Option<Cached<Membership>> {
        self.inner.state.read().group.clone()
    }

    /// Last power state read by `get_power` or `get_light_power`
    pub fn power(&self) -> Option<Cached<Power>> {
        self.inner.state.read().power.clone()
    }

    pub fn color(&self) -> Option<Cached<Hsbk>> {
        self.inner.state.read().color.clone()
    }

    pub fn version(&self) -> Option<Cached<ProductVersion>> {
        self.inner.state.read().version.clone()
    }

    // ========================================================================
    // Device operations
    // ========================================================================

    /// Re-read label, location, group, power, both firmware versions and the
    /// product version.
    pub fn refresh(&self) -> Result<()> {
        self.get_label()?;
        self.get_location()?;
        self.get_group()?;
        self.get_power()?;
        self.get_host_firmware_tuple()?;
        self.get_wifi_firmware_tuple()?;
        self.get_version_tuple()?;
        Ok(())
    }

    pub fn get_label(&self) -> Result<String> {
        match self.request(Payload::GetLabel, MessageType::StateLabel)? {
            Payload::StateLabel { label } => {
                self.inner.state.write().label = Some(Cached::new(label.clone()));
                Ok(label)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Set the label. Labels longer than 32 bytes are cut at the last
    /// character boundary that fits.
    pub fn set_label(&self, label: &str) -> Result<()> {
        let label = truncate_label(label).to_string();
        self.send(Payload::SetLabel { label }, false)
    }

    /// Location label
    pub fn get_location(&self) -> Result<String> {
        Ok(self.fetch_location()?.label)
    }

    /// Location as `(id, label, updated_at)`
    pub fn get_location_tuple(&self) -> Result<([u8; 16], String, u64)> {
        let location = self.fetch_location()?;
        Ok((location.id, location.label, location.updated_at))
    }

    fn fetch_location(&self) -> Result<Membership> {
        match self.request(Payload::GetLocation, MessageType::StateLocation)? {
            Payload::StateLocation {
                location,
                label,
                updated_at,
            } => {
                let membership = Membership {
                    id: location,
                    label,
                    updated_at,
                };
                self.inner.state.write().location = Some(Cached::new(membership.clone()));
                Ok(membership)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Group label
    pub fn get_group(&self) -> Result<String> {
        Ok(self.fetch_group()?.label)
    }

    /// Group as `(id, label, updated_at)`
    pub fn get_group_tuple(&self) -> Result<([u8; 16], String, u64)> {
        let group = self.fetch_group()?;
        Ok((group.id, group.label, group.updated_at))
    }

    fn fetch_group(&self) -> Result<Membership> {
        match self.request(Payload::GetGroup, MessageType::StateGroup)? {
            Payload::StateGroup {
                group,
                label,
                updated_at,
            } => {
                let membership = Membership {
                    id: group,
                    label,
                    updated_at,
                };
                self.inner.state.write().group = Some(Cached::new(membership.clone()));
                Ok(membership)
            }
            other => Err(unexpected(other)),
        }
    }

    pub fn get_power(&self) -> Result<Power> {
        match self.request(Payload::GetPower, MessageType::StatePower)? {
            Payload::StatePower { level } => Ok(self.cache_power(level)),
            other => Err(unexpected(other)),
        }
    }

    pub fn set_power(&self, power: Power, rapid: bool) -> Result<()> {
        self.send(
            Payload::SetPower {
                level: power.level(),
            },
            rapid,
        )
    }

    /// Host firmware as `(build timestamp in ns, version)`
    pub fn get_host_firmware_tuple(&self) -> Result<(u64, FirmwareVersion)> {
        match self.request(Payload::GetHostFirmware, MessageType::StateHostFirmware)? {
            Payload::StateHostFirmware { build, version } => {
                let firmware = (build, FirmwareVersion::from(version));
                self.inner.state.write().host_firmware = Some(Cached::new(firmware));
                Ok(firmware)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Wifi firmware as `(build timestamp in ns, version)`
    pub fn get_wifi_firmware_tuple(&self) -> Result<(u64, FirmwareVersion)> {
        match self.request(Payload::GetWifiFirmware, MessageType::StateWifiFirmware)? {
            Payload::StateWifiFirmware { build, version } => {
                let firmware = (build, FirmwareVersion::from(version));
                self.inner.state.write().wifi_firmware = Some(Cached::new(firmware));
                Ok(firmware)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Wifi radio as `(signal in mW, tx bytes, rx bytes)`
    pub fn get_wifi_info_tuple(&self) -> Result<(f32, u32, u32)> {
        match self.request(Payload::GetWifiInfo, MessageType::StateWifiInfo)? {
            Payload::StateWifiInfo { signal, tx, rx } => Ok((signal, tx, rx)),
            other => Err(unexpected(other)),
        }
    }

    /// `(vendor, product, version)`
    pub fn get_version_tuple(&self) -> Result<(u32, u32, u32)> {
        let version = self.fetch_version()?;
        Ok((version.vendor, version.product, version.version))
    }

    fn fetch_version(&self) -> Result<ProductVersion> {
        match self.request(Payload::GetVersion, MessageType::StateVersion)? {
            Payload::StateVersion {
                vendor,
                product,
                version,
            } => {
                let version = ProductVersion {
                    vendor,
                    product,
                    version,
                };
                self.inner.state.write().version = Some(Cached::new(version));
                Ok(version)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Product version from the cache, asking the device only if it has
    /// never been read
    fn product_version(&self) -> Result<ProductVersion> {
        match self.version() {
            Some(cached) => Ok(cached.value),
            None => self.fetch_version(),
        }
    }

    /// `(current time, uptime, downtime)`, all in nanoseconds
    pub fn get_info_tuple(&self) -> Result<(u64, u64, u64)> {
        match self.request(Payload::GetInfo, MessageType::StateInfo)? {
            Payload::StateInfo {
                time,
                uptime,
                downtime,
            } => Ok((time, uptime, downtime)),
            other => Err(unexpected(other)),
        }
    }

    /// Catalog name of the product, `None` for products the catalog does not
    /// know
    pub fn get_product_name(&self) -> Result<Option<String>> {
        let version = self.product_version()?;
        Ok(self.inner.catalog.name(version.product).map(str::to_string))
    }

    pub fn get_product_features(&self) -> Result<Option<Features>> {
        let version = self.product_version()?;
        Ok(self.inner.catalog.features(version.product))
    }

    pub fn supports_color(&self) -> Result<bool> {
        self.supports(|features| features.color)
    }

    pub fn supports_temperature(&self) -> Result<bool> {
        self.supports(|features| features.temperature)
    }

    pub fn supports_multizone(&self) -> Result<bool> {
        self.supports(|features| features.multizone)
    }

    pub fn supports_infrared(&self) -> Result<bool> {
        self.supports(|features| features.infrared)
    }

    pub fn supports_chain(&self) -> Result<bool> {
        self.supports(|features| features.chain)
    }

    fn supports(&self, feature: impl Fn(&Features) -> bool) -> Result<bool> {
        Ok(self
            .get_product_features()?
            .map_or(false, |features| feature(&features)))
    }

    // ========================================================================
    // Light operations
    // ========================================================================

    pub fn get_color(&self) -> Result<Hsbk> {
        self.ensure_light()?;
        match self.request(Payload::LightGet, MessageType::LightState)? {
            Payload::LightState { color, .. } => {
                self.inner.state.write().color = Some(Cached::new(color));
                Ok(color)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Fade to `color` over `duration`
    pub fn set_color(&self, color: Hsbk, duration: Duration, rapid: bool) -> Result<()> {
        self.ensure_light()?;
        color.validate()?;
        let duration = duration_millis(duration, "duration")?;
        self.send(Payload::LightSetColor { color, duration }, rapid)
    }

    pub fn get_light_power(&self) -> Result<Power> {
        self.ensure_light()?;
        match self.request(Payload::LightGetPower, MessageType::LightStatePower)? {
            Payload::LightStatePower { level } => Ok(self.cache_power(level)),
            other => Err(unexpected(other)),
        }
    }

    /// Switch power, fading over `duration`
    pub fn set_light_power(&self, power: Power, duration: Duration, rapid: bool) -> Result<()> {
        self.ensure_light()?;
        let duration = duration_millis(duration, "duration")?;
        self.send(
            Payload::LightSetPower {
                level: power.level(),
                duration,
            },
            rapid,
        )
    }

    pub fn set_waveform(&self, effect: &WaveformEffect, rapid: bool) -> Result<()> {
        self.ensure_light()?;
        self.send(effect.to_payload()?, rapid)
    }

    fn ensure_light(&self) -> Result<()> {
        if self.is_light() {
            Ok(())
        } else {
            Err(SdkError::NotALight(self.inner.mac))
        }
    }

    // ========================================================================
    // Exchanges
    // ========================================================================

    fn request(&self, payload: Payload, expected: MessageType) -> Result<Payload> {
        let engine = &self.inner.engine;
        let reply = engine.request_response(
            &self.target(),
            payload,
            &[expected],
            engine.config().unicast(),
        )?;
        self.observe(reply.from);
        Ok(reply.message.payload)
    }

    /// Acknowledged send, or a burst of unacknowledged ones when `rapid`
    fn send(&self, payload: Payload, rapid: bool) -> Result<()> {
        let engine = &self.inner.engine;
        let config = engine.config();
        if rapid {
            engine.fire_and_forget(
                &self.target(),
                payload,
                config.unicast_attempts as usize,
                config.burst_interval,
            )?;
        } else {
            let reply = engine.request_with_ack(&self.target(), payload, config.unicast())?;
            self.observe(reply.from);
        }
        Ok(())
    }

    fn cache_power(&self, level: u16) -> Power {
        let power = Power::from_reported_level(level);
        self.inner.state.write().power = Some(Cached::new(power));
        power
    }
}

fn unexpected(payload: Payload) -> SdkError {
    SdkError::UnexpectedReply(payload.message_type())
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.inner.mac == other.inner.mac
    }
}

impl Eq for Device {}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("mac", &self.inner.mac)
            .field("role", &self.inner.role)
            .field("addr", &self.addr())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{} ({})", label.value, self.inner.mac),
            None => write!(f, "{}", self.inner.mac),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifx_exchange::testing::{SimulatedDevice, SimulatedNetwork};
    use lifx_exchange::ExchangeConfig;
    use lifx_protocol::LanCodec;

    fn engine(network: &SimulatedNetwork) -> Arc<ExchangeEngine> {
        let config = ExchangeConfig::new().with_timeout(Duration::from_millis(50));
        Arc::new(
            ExchangeEngine::with_parts(config, Arc::new(network.clone()), Arc::new(LanCodec))
                .unwrap(),
        )
    }

    #[test]
    fn test_generic_device_rejects_light_ops_without_traffic() {
        let sim = SimulatedDevice::light(1);
        let network = SimulatedNetwork::with_devices([sim.clone()]);
        let device = Device::new(sim.mac, Some(sim.addr()), DeviceRole::Generic, engine(&network));

        let red = Hsbk::new(0, 65535, 65535, 3500).unwrap();
        assert!(matches!(device.get_color(), Err(SdkError::NotALight(mac)) if mac == sim.mac));
        assert!(matches!(
            device.set_color(red, Duration::ZERO, false),
            Err(SdkError::NotALight(_))
        ));
        assert!(matches!(device.get_light_power(), Err(SdkError::NotALight(_))));
        assert!(matches!(
            device.set_light_power(Power::On, Duration::ZERO, true),
            Err(SdkError::NotALight(_))
        ));
        assert_eq!(network.stats().opened, 0);
    }

    #[test]
    fn test_clones_share_cache() {
        let sim = SimulatedDevice::light(1).with_label("Desk");
        let network = SimulatedNetwork::with_devices([sim.clone()]);
        let device = Device::new(sim.mac, None, DeviceRole::Light, engine(&network));
        let clone = device.clone();

        assert!(clone.label().is_none());
        device.get_label().unwrap();
        assert_eq!(clone.label().unwrap().value, "Desk");
        assert_eq!(clone.addr(), Some(sim.addr()));
        assert_eq!(clone.to_string(), format!("Desk ({})", sim.mac));
    }

    #[test]
    fn test_equality_is_by_hardware_address() {
        let network = SimulatedNetwork::new();
        let mac = SimulatedDevice::light(1).mac;
        let a = Device::new(mac, None, DeviceRole::Light, engine(&network));
        let b = Device::new(mac, None, DeviceRole::Generic, engine(&network));
        let c = Device::new(SimulatedDevice::light(2).mac, None, DeviceRole::Light, engine(&network));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
