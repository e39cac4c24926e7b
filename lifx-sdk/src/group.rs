//! Named collections of devices
//!
//! A [`Group`] is a client-side selection of devices, usually built by
//! [`LifxLan`](crate::LifxLan) from labels, group or location names. It is
//! unrelated to the group membership a device reports about itself.

use std::thread;
use std::time::Duration;

use lifx_protocol::{HardwareAddress, Hsbk, Power};

use crate::device::Device;
use crate::error::Result;

/// Devices controlled together
///
/// Commands fan out to every member on its own thread and return once all
/// members have finished. The first failure, in member order, is reported.
///
/// # Example
///
/// ```rust,ignore
/// let porch = lifx.get_devices_by_names(&["Porch Left", "Porch Right"])?;
/// porch.set_power(Power::On, false)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Group {
    devices: Vec<Device>,
}

impl Group {
    /// Group of `devices`, keeping the first handle for each hardware
    /// address
    pub fn new(devices: impl IntoIterator<Item = Device>) -> Self {
        let mut group = Self::default();
        for device in devices {
            group.add_device(device);
        }
        group
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, mac: HardwareAddress) -> bool {
        self.devices.iter().any(|device| device.mac() == mac)
    }

    /// Add a member. Returns false if a device with the same hardware
    /// address is already in the group.
    pub fn add_device(&mut self, device: Device) -> bool {
        if self.contains(device.mac()) {
            return false;
        }
        self.devices.push(device);
        true
    }

    pub fn remove_device(&mut self, mac: HardwareAddress) -> Option<Device> {
        let index = self.devices.iter().position(|device| device.mac() == mac)?;
        Some(self.devices.remove(index))
    }

    pub fn set_power(&self, power: Power, rapid: bool) -> Result<()> {
        first_error(fan_out(&self.devices, |device| device.set_power(power, rapid)))
    }

    /// Set the color of every light in the group; other members are skipped
    pub fn set_color(&self, color: Hsbk, duration: Duration, rapid: bool) -> Result<()> {
        first_error(fan_out(&self.lights(), |device| {
            device.set_color(color, duration, rapid)
        }))
    }

    /// Switch every light in the group; other members are skipped
    pub fn set_light_power(&self, power: Power, duration: Duration, rapid: bool) -> Result<()> {
        first_error(fan_out(&self.lights(), |device| {
            device.set_light_power(power, duration, rapid)
        }))
    }

    fn lights(&self) -> Vec<Device> {
        self.devices
            .iter()
            .filter(|device| device.is_light())
            .cloned()
            .collect()
    }
}

impl FromIterator<Device> for Group {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Run `op` against every device on its own scoped thread. Results are in
/// device order.
pub(crate) fn fan_out<T, F>(devices: &[Device], op: F) -> Vec<Result<T>>
where
    T: Send,
    F: Fn(&Device) -> Result<T> + Sync,
{
    let op = &op;
    thread::scope(|scope| {
        let handles: Vec<_> = devices
            .iter()
            .map(|device| scope.spawn(move || op(device)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

fn first_error(results: Vec<Result<()>>) -> Result<()> {
    results.into_iter().collect()
}
