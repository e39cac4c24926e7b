//! Test helpers for driving the SDK against the simulated network

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lifx_exchange::testing::{SimulatedDevice, SimulatedNetwork};
use lifx_exchange::{ExchangeConfig, ExchangeEngine};
use lifx_protocol::{LanCodec, MessageType};
use lifx_sdk::{Device, DeviceRole, Hsbk, LifxLan};

/// Short timeouts and a single broadcast attempt so scenarios stay fast
pub fn test_config() -> ExchangeConfig {
    ExchangeConfig::new()
        .with_timeout(Duration::from_millis(50))
        .with_broadcast_attempts(1)
        .with_ack_timeout_bonus(Duration::ZERO)
        .with_burst(20, Duration::from_millis(1))
}

pub fn engine_on(network: &SimulatedNetwork) -> Arc<ExchangeEngine> {
    Arc::new(
        ExchangeEngine::with_parts(test_config(), Arc::new(network.clone()), Arc::new(LanCodec))
            .expect("valid test config"),
    )
}

pub fn client_on(network: &SimulatedNetwork) -> LifxLan {
    LifxLan::with_engine(engine_on(network))
}

/// Light handle whose address is already known
pub fn light_on(network: &SimulatedNetwork, device: &SimulatedDevice) -> Device {
    Device::new(device.mac, Some(device.addr()), DeviceRole::Light, engine_on(network))
}

pub fn red() -> Hsbk {
    Hsbk::new(0, 65535, 65535, 3500).expect("valid color")
}

/// How many requests of `kind` went out
pub fn sends_of(network: &SimulatedNetwork, kind: MessageType) -> usize {
    network
        .sent()
        .iter()
        .filter(|datagram| datagram.message.message_type() == kind)
        .count()
}
