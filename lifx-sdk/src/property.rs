//! Cached device attributes
//!
//! Every `get_*` call on a [`Device`](crate::Device) goes to the network and
//! stores what it learned in a [`Cached`] slot. The matching plain accessor
//! (`label()`, `power()`, ...) reads that slot without any traffic. A slot is
//! only ever written by its own `get_*` call.

use std::time::{Duration, Instant};

/// A value and the moment it was read from the device.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub fetched_at: Instant,
}

impl<T> Cached<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// True if the value was read less than `max_age` ago
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.age() < max_age
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Location or group membership as reported by a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Membership {
    /// Opaque 16 byte identifier shared by every member
    pub id: [u8; 16],
    pub label: String,
    /// Nanoseconds since the epoch of the last change
    pub updated_at: u64,
}
