//! Simple device discovery that outputs JSON for scripting
//!
//! Usage: cargo run -p lifx-sdk-discovery --example discover_json [timeout_ms]

use lifx_discovery::get_with_config;
use lifx_exchange::ExchangeConfig;
use std::time::Duration;

fn main() {
    let timeout = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    let config = ExchangeConfig::default().with_timeout(Duration::from_millis(timeout));
    let devices = get_with_config(config);

    println!("{}", serde_json::to_string_pretty(&devices).unwrap());
}
