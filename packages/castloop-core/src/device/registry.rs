//! Thread-safe registry of currently visible renderers.
//!
//! Keyed by friendly name. Mutated only by the discovery listener; read by
//! the session controller and the HTTP layer. Every operation holds the
//! registry lock for the map access alone, and readers get copies.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::types::DeviceRecord;

/// Mapping from friendly device name to connection metadata.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record stored under `record.name`.
    ///
    /// Returns `true` if the name was not present before.
    pub fn upsert(&self, record: DeviceRecord) -> bool {
        self.devices
            .write()
            .insert(record.name.clone(), record)
            .is_none()
    }

    /// Removes the record for `name`, if any.
    pub fn remove(&self, name: &str) -> Option<DeviceRecord> {
        self.devices.write().remove(name)
    }

    /// Returns an alphabetically sorted copy of the device names.
    pub fn snapshot(&self) -> Vec<String> {
        let mut names: Vec<String> = self.devices.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Looks up a device by friendly name.
    ///
    /// `None` means the device is not currently visible, which is a normal
    /// outcome rather than an error.
    pub fn lookup(&self, name: &str) -> Option<DeviceRecord> {
        self.devices.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::types::DeviceInfo;

    fn record(name: &str, host: &str) -> DeviceRecord {
        DeviceRecord::new(DeviceInfo {
            id: format!("id-{}", name),
            friendly_name: name.to_string(),
            host: host.to_string(),
            port: 8009,
            model: None,
        })
    }

    #[test]
    fn repeated_upserts_converge_to_one_entry() {
        let registry = DeviceRegistry::new();
        assert!(registry.upsert(record("Kitchen", "192.168.1.20")));
        assert!(!registry.upsert(record("Kitchen", "192.168.1.20")));
        assert!(!registry.upsert(record("Kitchen", "192.168.1.21")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("Kitchen").unwrap().info.host, "192.168.1.21");
    }

    #[test]
    fn remove_unknown_name_is_noop() {
        let registry = DeviceRegistry::new();
        registry.upsert(record("Kitchen", "192.168.1.20"));

        assert!(registry.remove("Garage").is_none());
        assert_eq!(registry.snapshot(), vec!["Kitchen".to_string()]);
    }

    #[test]
    fn remove_twice_is_idempotent() {
        let registry = DeviceRegistry::new();
        registry.upsert(record("Kitchen", "192.168.1.20"));

        assert!(registry.remove("Kitchen").is_some());
        assert!(registry.remove("Kitchen").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_copy() {
        let registry = DeviceRegistry::new();
        registry.upsert(record("Living Room", "192.168.1.21"));
        registry.upsert(record("Bedroom", "192.168.1.22"));
        registry.upsert(record("Kitchen", "192.168.1.20"));

        let snapshot = registry.snapshot();
        registry.remove("Kitchen");

        assert_eq!(snapshot, vec!["Bedroom", "Kitchen", "Living Room"]);
        assert_eq!(registry.snapshot(), vec!["Bedroom", "Living Room"]);
    }

    #[test]
    fn lookup_absent_returns_none() {
        let registry = DeviceRegistry::new();
        assert!(registry.lookup("Nowhere").is_none());
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let registry = Arc::new(DeviceRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        let name = format!("Device {}", n % 10);
                        registry.upsert(record(&name, &format!("10.0.0.{}", i)));
                        let _ = registry.snapshot();
                        if n % 7 == 0 {
                            registry.remove(&name);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert!(snapshot.len() <= 10);
        let mut sorted = snapshot.clone();
        sorted.sort();
        assert_eq!(snapshot, sorted);
    }
}
