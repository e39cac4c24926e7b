//! In-memory network of scripted devices.
//!
//! [`SimulatedNetwork`] implements [`Transport`] without touching the OS.
//! Every socket it opens answers sends synchronously from the scripted
//! devices and sleeps out the full wait when its inbox is empty, so timing
//! behaves like a quiet LAN. Counters record every open, close, send and
//! receive for assertions.

use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lifx_protocol::{
    Codec, HardwareAddress, Hsbk, LanCodec, Message, MessageType, Payload, DEFAULT_PORT,
    SERVICE_UDP,
};
use parking_lot::Mutex;

use crate::error::{ExchangeError, Result};
use crate::transport::{DatagramSocket, Received, Transport};

/// Broadcast address the simulated LAN listens on
pub const SIMULATED_BROADCAST: Ipv4Addr = Ipv4Addr::BROADCAST;

/// One scripted device.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub mac: HardwareAddress,
    pub ip: Ipv4Addr,
    pub product: u32,
    pub label: String,
    pub group: String,
    pub location: String,
    pub power: u16,
    pub color: Hsbk,
    pub host_firmware: u32,
    pub wifi_firmware: u32,
    /// Requests whose replies are swallowed before the device starts answering
    pub drop_replies: usize,
    pub silent: bool,
    /// Replies carry a session id other than the requester's
    pub foreign_session: bool,
    /// Every reply is sent twice
    pub duplicate_replies: bool,
    /// Replies carry the all-zero address instead of the device's own
    pub unattributed: bool,
    /// A truncated copy of every reply arrives just ahead of it
    pub garbled_replies: bool,
    /// Request types the device never answers
    pub ignored: Vec<MessageType>,
}

impl SimulatedDevice {
    /// An A19 bulb at `192.168.1.<n>` with hardware address `d0:73:d5:00:00:<n>`
    pub fn light(n: u8) -> Self {
        Self {
            mac: HardwareAddress::new([0xd0, 0x73, 0xd5, 0x00, 0x00, n]),
            ip: Ipv4Addr::new(192, 168, 1, n),
            product: 27,
            label: format!("Light {}", n),
            group: "Living Room".to_string(),
            location: "Home".to_string(),
            power: 0,
            color: Hsbk {
                hue: 0,
                saturation: 0,
                brightness: u16::MAX,
                kelvin: 3500,
            },
            host_firmware: (3 << 16) | 70,
            wifi_firmware: (1 << 16) | 1,
            drop_replies: 0,
            silent: false,
            foreign_session: false,
            duplicate_replies: false,
            unattributed: false,
            garbled_replies: false,
            ignored: Vec::new(),
        }
    }

    pub fn with_product(mut self, product: u32) -> Self {
        self.product = product;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    pub fn with_power(mut self, level: u16) -> Self {
        self.power = level;
        self
    }

    pub fn dropping_first(mut self, replies: usize) -> Self {
        self.drop_replies = replies;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn with_foreign_session(mut self) -> Self {
        self.foreign_session = true;
        self
    }

    pub fn with_duplicate_replies(mut self) -> Self {
        self.duplicate_replies = true;
        self
    }

    pub fn unattributed(mut self) -> Self {
        self.unattributed = true;
        self
    }

    pub fn with_garbled_replies(mut self) -> Self {
        self.garbled_replies = true;
        self
    }

    pub fn ignoring(mut self, kind: MessageType) -> Self {
        self.ignored.push(kind);
        self
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, DEFAULT_PORT))
    }

    fn hears(&self, to: SocketAddr, request: &Message) -> bool {
        let reachable = match to {
            SocketAddr::V4(v4) => *v4.ip() == SIMULATED_BROADCAST || *v4.ip() == self.ip,
            SocketAddr::V6(_) => false,
        };
        reachable && (request.target.is_broadcast() || request.target == self.mac)
    }

    fn respond(&mut self, request: &Message) -> Vec<Message> {
        let kind = request.message_type();
        if self.silent || self.ignored.contains(&kind) {
            return Vec::new();
        }

        let (state, is_set) = self.apply(&request.payload);
        let mut payloads = Vec::new();
        if request.ack_required {
            payloads.push(Payload::Acknowledgement);
        }
        if let Some(state) = state {
            if !is_set || request.res_required {
                payloads.push(state);
            }
        }
        if payloads.is_empty() {
            return Vec::new();
        }

        if self.drop_replies > 0 {
            self.drop_replies -= 1;
            return Vec::new();
        }

        let source = if self.foreign_session {
            request.source.wrapping_add(1)
        } else {
            request.source
        };
        let origin = if self.unattributed {
            HardwareAddress::BROADCAST
        } else {
            self.mac
        };
        let copies = if self.duplicate_replies { 2 } else { 1 };

        payloads
            .into_iter()
            .flat_map(|payload| {
                let reply = Message::new(payload)
                    .with_source(source)
                    .with_target(origin)
                    .with_sequence(request.sequence);
                std::iter::repeat(reply).take(copies)
            })
            .collect()
    }

    /// Apply a request to the device state. Returns the state reply, if the
    /// request type has one, and whether the request was a setter.
    fn apply(&mut self, payload: &Payload) -> (Option<Payload>, bool) {
        match payload {
            Payload::GetService => (
                Some(Payload::StateService {
                    service: SERVICE_UDP,
                    port: u32::from(DEFAULT_PORT),
                }),
                false,
            ),
            Payload::GetHostFirmware => (
                Some(Payload::StateHostFirmware {
                    build: 1_500_000_000,
                    version: self.host_firmware,
                }),
                false,
            ),
            Payload::GetWifiFirmware => (
                Some(Payload::StateWifiFirmware {
                    build: 1_400_000_000,
                    version: self.wifi_firmware,
                }),
                false,
            ),
            Payload::GetWifiInfo => (
                Some(Payload::StateWifiInfo {
                    signal: 0.0001,
                    tx: 1024,
                    rx: 2048,
                }),
                false,
            ),
            Payload::GetPower => (Some(Payload::StatePower { level: self.power }), false),
            Payload::SetPower { level } => {
                self.power = *level;
                (Some(Payload::StatePower { level: self.power }), true)
            }
            Payload::GetLabel => (
                Some(Payload::StateLabel {
                    label: self.label.clone(),
                }),
                false,
            ),
            Payload::SetLabel { label } => {
                self.label = label.clone();
                (
                    Some(Payload::StateLabel {
                        label: self.label.clone(),
                    }),
                    true,
                )
            }
            Payload::GetVersion => (
                Some(Payload::StateVersion {
                    vendor: 1,
                    product: self.product,
                    version: 0,
                }),
                false,
            ),
            Payload::GetInfo => (
                Some(Payload::StateInfo {
                    time: 1_600_000_000_000_000_000,
                    uptime: 3_600_000_000_000,
                    downtime: 0,
                }),
                false,
            ),
            Payload::GetLocation => (
                Some(Payload::StateLocation {
                    location: id_from(&self.location),
                    label: self.location.clone(),
                    updated_at: 1_500_000_000_000_000_000,
                }),
                false,
            ),
            Payload::GetGroup => (
                Some(Payload::StateGroup {
                    group: id_from(&self.group),
                    label: self.group.clone(),
                    updated_at: 1_500_000_000_000_000_000,
                }),
                false,
            ),
            Payload::LightGet => (Some(self.light_state()), false),
            Payload::LightSetColor { color, .. } => {
                self.color = *color;
                (Some(self.light_state()), true)
            }
            Payload::LightSetWaveform { color, transient, .. } => {
                if !transient {
                    self.color = *color;
                }
                (Some(self.light_state()), true)
            }
            Payload::LightGetPower => (Some(Payload::LightStatePower { level: self.power }), false),
            Payload::LightSetPower { level, .. } => {
                self.power = *level;
                (Some(Payload::LightStatePower { level: self.power }), true)
            }
            _ => (None, false),
        }
    }

    fn light_state(&self) -> Payload {
        Payload::LightState {
            color: self.color,
            power: self.power,
            label: self.label.clone(),
        }
    }
}

fn id_from(label: &str) -> [u8; 16] {
    let mut id = [0u8; 16];
    for (slot, byte) in id.iter_mut().zip(label.bytes()) {
        *slot = byte;
    }
    id
}

/// Socket and traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub opened: usize,
    pub closed: usize,
    pub sends: usize,
    pub receives: usize,
}

/// A datagram some socket sent, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SentDatagram {
    pub to: SocketAddr,
    pub message: Message,
}

#[derive(Debug, Default)]
struct NetworkState {
    devices: Vec<SimulatedDevice>,
    stats: NetworkStats,
    sent: Vec<SentDatagram>,
    fail_next_open: bool,
}

/// Shared handle to a simulated LAN. Clones see the same devices and
/// counters.
#[derive(Debug, Clone, Default)]
pub struct SimulatedNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: impl IntoIterator<Item = SimulatedDevice>) -> Self {
        let network = Self::new();
        network.state.lock().devices.extend(devices);
        network
    }

    pub fn add_device(&self, device: SimulatedDevice) {
        self.state.lock().devices.push(device);
    }

    pub fn remove_device(&self, mac: HardwareAddress) -> Option<SimulatedDevice> {
        let mut state = self.state.lock();
        let index = state.devices.iter().position(|device| device.mac == mac)?;
        Some(state.devices.remove(index))
    }

    pub fn update_device(&self, mac: HardwareAddress, update: impl FnOnce(&mut SimulatedDevice)) {
        if let Some(device) = self.state.lock().devices.iter_mut().find(|d| d.mac == mac) {
            update(device);
        }
    }

    pub fn device(&self, mac: HardwareAddress) -> Option<SimulatedDevice> {
        self.state
            .lock()
            .devices
            .iter()
            .find(|device| device.mac == mac)
            .cloned()
    }

    pub fn stats(&self) -> NetworkStats {
        self.state.lock().stats
    }

    /// Every datagram sent since creation or the last reset
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.state.lock().sent.clone()
    }

    /// Make the next `open` fail as if the port were taken
    pub fn fail_next_open(&self) {
        self.state.lock().fail_next_open = true;
    }

    pub fn reset_stats(&self) {
        let mut state = self.state.lock();
        state.stats = NetworkStats::default();
        state.sent.clear();
    }
}

impl Transport for SimulatedNetwork {
    fn open(&self, _timeout: Duration) -> Result<Box<dyn DatagramSocket>> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_open) {
            return Err(ExchangeError::SocketOpen(io::Error::new(
                io::ErrorKind::AddrInUse,
                "simulated bind failure",
            )));
        }
        state.stats.opened += 1;
        drop(state);
        Ok(Box::new(SimulatedSocket {
            state: Arc::clone(&self.state),
            inbox: VecDeque::new(),
        }))
    }

    fn broadcast_addresses(&self) -> Vec<Ipv4Addr> {
        vec![SIMULATED_BROADCAST]
    }
}

struct SimulatedSocket {
    state: Arc<Mutex<NetworkState>>,
    inbox: VecDeque<(Vec<u8>, SocketAddr)>,
}

impl DatagramSocket for SimulatedSocket {
    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> Result<()> {
        let mut state = self.state.lock();
        state.stats.sends += 1;
        let Ok(request) = LanCodec.decode(bytes) else {
            return Ok(());
        };
        state.sent.push(SentDatagram {
            to: addr,
            message: request.clone(),
        });

        for device in state.devices.iter_mut() {
            if !device.hears(addr, &request) {
                continue;
            }
            let from = device.addr();
            for reply in device.respond(&request) {
                let bytes = LanCodec.encode(&reply);
                if device.garbled_replies {
                    self.inbox.push_back((bytes[..bytes.len() / 2].to_vec(), from));
                }
                self.inbox.push_back((bytes, from));
            }
        }
        Ok(())
    }

    fn recv(&mut self, wait: Duration) -> Result<Received> {
        self.state.lock().stats.receives += 1;
        match self.inbox.pop_front() {
            Some((bytes, from)) => Ok(Received::Datagram(bytes, from)),
            None => {
                thread::sleep(wait);
                Ok(Received::Timeout)
            }
        }
    }
}

impl Drop for SimulatedSocket {
    fn drop(&mut self) {
        self.state.lock().stats.closed += 1;
    }
}
