//! Scripted in-memory renderers for session and controller tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{DeviceClient, DeviceConnector};
use super::types::{DeviceInfo, DeviceRecord, IdleReason, MediaStatus, PlayerState};
use super::{DeviceError, DeviceResult};

/// Commands issued across all mock devices, in order: `(device, command)`.
pub(crate) type Journal = Arc<Mutex<Vec<(String, String)>>>;

pub(crate) fn record(name: &str) -> DeviceRecord {
    DeviceRecord::new(DeviceInfo {
        id: format!("{}-id", name.to_lowercase().replace(' ', "-")),
        friendly_name: name.to_string(),
        host: "192.168.1.50".to_string(),
        port: 8009,
        model: Some("Chromecast Audio".to_string()),
    })
}

pub(crate) fn playing() -> MediaStatus {
    MediaStatus::new(PlayerState::Playing, None)
}

pub(crate) fn finished() -> MediaStatus {
    MediaStatus::new(PlayerState::Idle, Some(IdleReason::Finished))
}

pub(crate) fn idle_cancelled() -> MediaStatus {
    MediaStatus::new(PlayerState::Idle, Some(IdleReason::Cancelled))
}

/// A fake renderer that records every call.
///
/// `status()` pops from a scripted queue and falls back to `steady` once the
/// queue is empty. Each call takes `latency` of (virtual) time so overlapping
/// calls from two tasks are observable through `max_in_flight`.
///
/// Clients handed out by [`MockConnector`] are leases on this device; a
/// session's lease lives as long as its watchdog, so `max_live_clients`
/// exposes two watchdogs (or a watchdog and a preparation) coexisting.
pub(crate) struct MockDeviceClient {
    name: String,
    journal: Journal,
    script: Mutex<VecDeque<MediaStatus>>,
    steady: Mutex<MediaStatus>,
    failing: Mutex<HashSet<&'static str>>,
    hang_activation: Mutex<bool>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    live_clients: AtomicUsize,
    max_live_clients: AtomicUsize,
}

impl MockDeviceClient {
    pub(crate) fn new(name: &str, journal: Journal) -> Self {
        Self {
            name: name.to_string(),
            journal,
            script: Mutex::new(VecDeque::new()),
            steady: Mutex::new(playing()),
            failing: Mutex::new(HashSet::new()),
            hang_activation: Mutex::new(false),
            latency: Duration::from_millis(10),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            live_clients: AtomicUsize::new(0),
            max_live_clients: AtomicUsize::new(0),
        }
    }

    pub(crate) fn script_statuses(&self, statuses: impl IntoIterator<Item = MediaStatus>) {
        self.script.lock().extend(statuses);
    }

    pub(crate) fn set_steady(&self, status: MediaStatus) {
        *self.steady.lock() = status;
    }

    pub(crate) fn fail(&self, action: &'static str) {
        self.failing.lock().insert(action);
    }

    pub(crate) fn hang_activation(&self) {
        *self.hang_activation.lock() = true;
    }

    /// Commands issued to this device, in order.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.journal
            .lock()
            .iter()
            .filter(|(device, _)| device == &self.name)
            .map(|(_, command)| command.clone())
            .collect()
    }

    pub(crate) fn count(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| c.as_str() == command).count()
    }

    /// Highest number of calls that were ever running at once on this device.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of connected clients that were ever alive at once.
    pub(crate) fn max_live_clients(&self) -> usize {
        self.max_live_clients.load(Ordering::SeqCst)
    }

    pub(crate) fn live_clients(&self) -> usize {
        self.live_clients.load(Ordering::SeqCst)
    }

    async fn call(&self, action: &'static str, entry: String) -> DeviceResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.journal.lock().push((self.name.clone(), entry));

        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().contains(action) {
            return Err(DeviceError::command(action, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceClient for MockDeviceClient {
    async fn wait_ready(&self) -> DeviceResult<()> {
        self.call("wait_ready", "wait_ready".into()).await
    }

    async fn play(&self, url: &str, _content_type: &str) -> DeviceResult<()> {
        self.call("play", format!("play {}", url)).await
    }

    async fn block_until_active(&self) -> DeviceResult<()> {
        self.call("block_until_active", "block_until_active".into())
            .await?;
        if *self.hang_activation.lock() {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn status(&self) -> DeviceResult<MediaStatus> {
        self.call("status", "status".into()).await?;
        let next = self.script.lock().pop_front();
        Ok(next.unwrap_or_else(|| *self.steady.lock()))
    }

    async fn stop(&self) -> DeviceResult<()> {
        self.call("stop", "stop".into()).await
    }

    async fn quit_app(&self) -> DeviceResult<()> {
        self.call("quit_app", "quit_app".into()).await
    }

    async fn set_volume(&self, level: f32) -> DeviceResult<()> {
        self.call("set_volume", format!("set_volume {}", level))
            .await
    }
}

/// A connected client; counts as live until dropped.
pub(crate) struct MockLease {
    device: Arc<MockDeviceClient>,
}

impl MockLease {
    fn new(device: Arc<MockDeviceClient>) -> Self {
        let now = device.live_clients.fetch_add(1, Ordering::SeqCst) + 1;
        device.max_live_clients.fetch_max(now, Ordering::SeqCst);
        Self { device }
    }
}

impl Drop for MockLease {
    fn drop(&mut self) {
        self.device.live_clients.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceClient for MockLease {
    async fn wait_ready(&self) -> DeviceResult<()> {
        self.device.wait_ready().await
    }

    async fn play(&self, url: &str, content_type: &str) -> DeviceResult<()> {
        self.device.play(url, content_type).await
    }

    async fn block_until_active(&self) -> DeviceResult<()> {
        self.device.block_until_active().await
    }

    async fn status(&self) -> DeviceResult<MediaStatus> {
        self.device.status().await
    }

    async fn stop(&self) -> DeviceResult<()> {
        self.device.stop().await
    }

    async fn quit_app(&self) -> DeviceResult<()> {
        self.device.quit_app().await
    }

    async fn set_volume(&self, level: f32) -> DeviceResult<()> {
        self.device.set_volume(level).await
    }
}

/// Hands out leases on one shared [`MockDeviceClient`] per device name.
#[derive(Default)]
pub(crate) struct MockConnector {
    journal: Journal,
    devices: Mutex<HashMap<String, Arc<MockDeviceClient>>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The mock behind `name`, created on first use.
    pub(crate) fn device(&self, name: &str) -> Arc<MockDeviceClient> {
        Arc::clone(
            self.devices
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MockDeviceClient::new(name, Arc::clone(&self.journal)))),
        )
    }

    /// Every command issued to any device, in order.
    pub(crate) fn journal(&self) -> Vec<(String, String)> {
        self.journal.lock().clone()
    }
}

impl DeviceConnector for MockConnector {
    fn connect(&self, record: &DeviceRecord) -> Arc<dyn DeviceClient> {
        Arc::new(MockLease::new(self.device(&record.name)))
    }
}
