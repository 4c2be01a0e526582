//! Bounded registry of the last discovery run

use super::DeviceRecord;
use std::sync::{Mutex, MutexGuard};

/// Devices from the most recent run, replaced wholesale on each publish
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: Mutex<Vec<DeviceRecord>>,
    capacity: usize,
}

impl DeviceRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            devices: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the contents; anything past capacity is dropped. Returns the stored count.
    pub fn replace(&self, mut devices: Vec<DeviceRecord>) -> usize {
        devices.truncate(self.capacity);
        let count = devices.len();
        *self.lock() = devices;
        count
    }

    /// Copy of at most `max` records, in discovery order
    pub fn snapshot(&self, max: usize) -> Vec<DeviceRecord> {
        self.lock().iter().take(max).cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DeviceRecord>> {
        self.devices.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
