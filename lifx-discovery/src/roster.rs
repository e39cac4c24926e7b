//! The device roster built by discovery.

use lifx_protocol::HardwareAddress;

use crate::device::DiscoveredDevice;

/// Every device seen by the latest discovery pass, plus the subset that are
/// lights, both in the order they answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    devices: Vec<DiscoveredDevice>,
    lights: Vec<DiscoveredDevice>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    pub fn lights(&self) -> &[DiscoveredDevice] {
        &self.lights
    }

    pub fn find(&self, mac: HardwareAddress) -> Option<&DiscoveredDevice> {
        self.devices.iter().find(|device| device.mac == mac)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.devices.clear();
        self.lights.clear();
    }

    pub(crate) fn push(&mut self, device: DiscoveredDevice) {
        if device.is_light() {
            self.lights.push(device.clone());
        }
        self.devices.push(device);
    }
}
