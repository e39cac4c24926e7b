//! Test helpers for discovery passes against the simulated network

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lifx_discovery::{ClassificationFallback, Discoverer};
use lifx_exchange::testing::SimulatedNetwork;
use lifx_exchange::{ExchangeConfig, ExchangeEngine};
use lifx_protocol::{BuiltinCatalog, LanCodec};

pub fn test_config() -> ExchangeConfig {
    ExchangeConfig::new()
        .with_timeout(Duration::from_millis(50))
        .with_broadcast_attempts(1)
}

pub fn discoverer_on(network: &SimulatedNetwork, config: ExchangeConfig) -> Discoverer {
    discoverer_with_fallback(network, config, ClassificationFallback::default())
}

pub fn discoverer_with_fallback(
    network: &SimulatedNetwork,
    config: ExchangeConfig,
    fallback: ClassificationFallback,
) -> Discoverer {
    let engine = ExchangeEngine::with_parts(config, Arc::new(network.clone()), Arc::new(LanCodec))
        .expect("valid test config");
    Discoverer::with_catalog(Arc::new(engine), Arc::new(BuiltinCatalog), fallback)
}
