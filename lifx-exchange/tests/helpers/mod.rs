//! Test helpers for exchange scenarios against the simulated network

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lifx_exchange::testing::{SimulatedDevice, SimulatedNetwork};
use lifx_exchange::{ExchangeConfig, ExchangeEngine, ExchangeOptions, Target};
use lifx_protocol::LanCodec;

/// Short timeouts so failing scenarios finish quickly
pub fn test_config() -> ExchangeConfig {
    ExchangeConfig::new()
        .with_timeout(Duration::from_millis(100))
        .with_burst(20, Duration::from_millis(1))
}

pub fn engine_on(network: &SimulatedNetwork, config: ExchangeConfig) -> ExchangeEngine {
    ExchangeEngine::with_parts(config, Arc::new(network.clone()), Arc::new(LanCodec))
        .expect("valid test config")
}

pub fn options(timeout_ms: u64, attempts: u32) -> ExchangeOptions {
    ExchangeOptions::new(Duration::from_millis(timeout_ms), attempts)
}

/// Target with a known address, as after a previous exchange
pub fn known(device: &SimulatedDevice) -> Target {
    Target::device(device.mac, Some(device.addr()))
}

/// Target whose address has not been learned yet
pub fn unknown(device: &SimulatedDevice) -> Target {
    Target::device(device.mac, None)
}

pub fn lights(count: u8) -> Vec<SimulatedDevice> {
    (1..=count).map(SimulatedDevice::light).collect()
}
