//! Discovery notification capability and its registry-backed implementation.

use std::sync::Arc;

use crate::device::{DeviceInfo, DeviceRecord, DeviceRegistry};

/// Receives add/update/remove notifications from a discovery protocol.
///
/// Callbacks run on the discovery task. Implementations must not block on
/// I/O and must tolerate duplicate or out-of-order notifications.
pub trait DiscoveryListener: Send + Sync {
    fn on_device_added(&self, id: &str, info: &DeviceInfo);

    fn on_device_updated(&self, id: &str, info: &DeviceInfo);

    fn on_device_removed(&self, id: &str, info: &DeviceInfo);
}

/// Mirrors discovery notifications into a [`DeviceRegistry`].
///
/// Holds nothing but the registry handle; idempotence comes from the
/// registry's upsert/remove semantics.
#[derive(Clone)]
pub struct RegistryListener {
    registry: Arc<DeviceRegistry>,
}

impl RegistryListener {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

impl DiscoveryListener for RegistryListener {
    fn on_device_added(&self, id: &str, info: &DeviceInfo) {
        if self.registry.upsert(DeviceRecord::new(info.clone())) {
            log::info!(
                "[Discovery] Device added: {} ({}) at {}:{}",
                info.friendly_name,
                id,
                info.host,
                info.port
            );
        }
    }

    fn on_device_updated(&self, id: &str, info: &DeviceInfo) {
        log::debug!("[Discovery] Device updated: {} ({})", info.friendly_name, id);
        self.on_device_added(id, info);
    }

    fn on_device_removed(&self, id: &str, info: &DeviceInfo) {
        if self.registry.remove(&info.friendly_name).is_some() {
            log::info!("[Discovery] Device removed: {} ({})", info.friendly_name, id);
        }
    }
}
