//! Broadcast destinations derived from the host's network interfaces.
//!
//! The lookup runs once per process; interfaces that appear later are not
//! picked up.

use std::net::Ipv4Addr;
use std::sync::OnceLock;

use if_addrs::{IfAddr, Interface};

static BROADCAST_ADDRESSES: OnceLock<Vec<Ipv4Addr>> = OnceLock::new();

/// Broadcast address of every non-loopback IPv4 interface, or the limited
/// broadcast address when none can be found.
pub fn broadcast_addresses() -> &'static [Ipv4Addr] {
    BROADCAST_ADDRESSES.get_or_init(|| match if_addrs::get_if_addrs() {
        Ok(interfaces) => {
            let found = from_interfaces(&interfaces);
            tracing::debug!("Broadcast addresses: {:?}", found);
            found
        }
        Err(e) => {
            tracing::warn!("Failed to enumerate network interfaces: {}", e);
            vec![Ipv4Addr::BROADCAST]
        }
    })
}

fn from_interfaces(interfaces: &[Interface]) -> Vec<Ipv4Addr> {
    let candidates = interfaces
        .iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match &iface.addr {
            IfAddr::V4(v4) => v4.broadcast,
            IfAddr::V6(_) => None,
        });
    dedup_or_limited(candidates)
}

fn dedup_or_limited(candidates: impl IntoIterator<Item = Ipv4Addr>) -> Vec<Ipv4Addr> {
    let mut addresses: Vec<Ipv4Addr> = Vec::new();
    for addr in candidates {
        if !addresses.contains(&addr) {
            addresses.push(addr);
        }
    }
    if addresses.is_empty() {
        addresses.push(Ipv4Addr::BROADCAST);
    }
    addresses
}
