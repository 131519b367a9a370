//! Discovery lifecycle: owns the mDNS browser and the task driving it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::device::DeviceRegistry;
use crate::discovery::{DiscoveryError, DiscoveryListener, MdnsBrowser, RegistryListener};
use crate::runtime::TokioSpawner;

/// Browser plus the task running its loop.
struct Running {
    browser: Arc<MdnsBrowser>,
    task: JoinHandle<()>,
}

/// Keeps the [`DeviceRegistry`] in sync with the network for the life of the process.
pub struct DiscoveryService {
    registry: Arc<DeviceRegistry>,
    service_type: String,
    spawner: TokioSpawner,
    cancel: CancellationToken,
    running: Mutex<Option<Running>>,
}

impl DiscoveryService {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        service_type: impl Into<String>,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            registry,
            service_type: service_type.into(),
            spawner,
            cancel: CancellationToken::new(),
            running: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Creates the mDNS daemon and starts browsing in the background.
    ///
    /// Calling it again while running is a no-op.
    ///
    /// # Errors
    /// Returns an error if the mDNS daemon cannot be created.
    pub fn start(&self) -> Result<(), DiscoveryError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let listener: Arc<dyn DiscoveryListener> =
            Arc::new(RegistryListener::new(Arc::clone(&self.registry)));
        let browser = Arc::new(MdnsBrowser::new(self.service_type.clone(), listener)?);

        let task_browser = Arc::clone(&browser);
        let cancel = self.cancel.clone();
        let task = self.spawner.spawn_joinable(async move {
            if let Err(e) = task_browser.run(cancel).await {
                log::error!("[Discovery] Browse failed: {}", e);
            }
        });

        log::info!("[Discovery] Started ({})", self.service_type);
        *running = Some(Running { browser, task });
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// Cancels the browse loop, waits for it, and shuts the daemon down.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let Some(running) = self.running.lock().take() else {
            return;
        };

        if let Err(e) = running.task.await {
            log::warn!("[Discovery] Browse task ended abnormally: {}", e);
        }
        running.browser.shutdown();
        log::info!("[Discovery] Stopped ({} devices known)", self.registry.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_before_start_is_noop() {
        let service = DiscoveryService::new(
            Arc::new(DeviceRegistry::new()),
            crate::protocol_constants::CAST_SERVICE_TYPE,
            TokioSpawner::current(),
        );

        service.shutdown().await;

        assert!(!service.is_running());
        assert!(service.registry().is_empty());
    }
}
