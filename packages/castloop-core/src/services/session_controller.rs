//! Process-wide playback control enforcing a single active session.
//!
//! All session transitions are serialized by one async mutex around the
//! session table. The lock is held for the whole transition (joining the old
//! watchdog, preparing the renderer, starting the new watchdog), so two
//! requests can never command the same renderer at once.
//!
//! Each transition runs on its own task. A caller that goes away mid-way
//! (an HTTP client disconnecting, a timeout) only stops waiting; the
//! transition still completes and releases the lock with the table and the
//! marker in agreement.
//!
//! `status()` reads a separate mirror of the active device and never waits
//! on a transition in progress.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use uuid::Uuid;

use super::playback_session::{PlaybackSession, SessionOptions, SessionPhase, SessionRelease};
use crate::context::NetworkContext;
use crate::device::{bounded, DeviceClient, DeviceConnector, DeviceRecord, DeviceRegistry, DeviceResult};
use crate::error::{CastLoopError, CastLoopResult, ErrorCode};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::SessionConfig;

/// Read-only view returned by [`SessionController::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    /// Sorted names of the currently visible renderers.
    pub device_names: Vec<String>,
    pub active_device_name: Option<String>,
    pub active_phase: Option<SessionPhase>,
}

/// Mirror of the session table's single entry.
struct ActiveMarker {
    device_name: String,
    session_id: Uuid,
    phase: watch::Receiver<SessionPhase>,
}

/// Owns every playback session and the active-device marker.
pub struct SessionController {
    registry: Arc<DeviceRegistry>,
    connector: Arc<dyn DeviceConnector>,
    network: NetworkContext,
    config: SessionConfig,
    spawner: TokioSpawner,
    /// Device name → session. At most one entry outside a transition.
    sessions: Mutex<HashMap<String, PlaybackSession>>,
    /// Written only while `sessions` is locked.
    active: RwLock<Option<ActiveMarker>>,
    release_tx: mpsc::UnboundedSender<SessionRelease>,
}

impl SessionController {
    /// Creates the controller and spawns its release handler.
    ///
    /// # Arguments
    /// * `registry` - Discovered renderers; read-only here
    /// * `connector` - Builds device clients from registry records
    /// * `network` - Source of the stream URL embedded in play commands
    /// * `config` - Defaults and watchdog timing
    /// * `spawner` - Runtime for watchdogs and the release handler
    pub fn new(
        registry: Arc<DeviceRegistry>,
        connector: Arc<dyn DeviceConnector>,
        network: NetworkContext,
        config: SessionConfig,
        spawner: TokioSpawner,
    ) -> Arc<Self> {
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        let controller = Arc::new(Self {
            registry,
            connector,
            network,
            config,
            spawner,
            sessions: Mutex::new(HashMap::new()),
            active: RwLock::new(None),
            release_tx,
        });
        controller.spawn_release_handler(release_rx);
        controller
    }

    fn spawn_release_handler(self: &Arc<Self>, mut release_rx: mpsc::UnboundedReceiver<SessionRelease>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.spawner.spawn(async move {
            while let Some(release) = release_rx.recv().await {
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                controller.handle_release(release).await;
            }
            log::debug!("[Controller] Release handler exiting");
        });
    }

    /// Removes a session whose watchdog gave up, unless it was already replaced.
    async fn handle_release(&self, release: SessionRelease) {
        let mut sessions = self.sessions.lock().await;
        let current = sessions
            .get(&release.device_name)
            .is_some_and(|s| s.id() == release.session_id);
        if !current {
            log::debug!(
                "[Controller] Ignoring stale release of {} for {}",
                release.session_id,
                release.device_name
            );
            return;
        }

        if let Some(session) = sessions.remove(&release.device_name) {
            session.stop_and_join().await;
        }
        self.clear_active(&release.device_name);
        log::warn!(
            "[Controller] Released failed session on {}",
            release.device_name
        );
    }

    /// Starts looping playback on `device_name`, replacing any current session.
    ///
    /// # Arguments
    /// * `device_name` - Registry name of the renderer
    /// * `volume` - Volume in `0.0..=1.0`; configured default when `None`
    /// * `loop_enabled` - Replay on natural end; configured default when `None`
    ///
    /// # Errors
    /// `DeviceNotFound` if the name is not visible, `InvalidRequest` for an
    /// out-of-range volume, `RemoteCommand` if preparing the renderer fails.
    pub async fn play(
        self: &Arc<Self>,
        device_name: &str,
        volume: Option<f32>,
        loop_enabled: Option<bool>,
    ) -> CastLoopResult<()> {
        let volume = check_volume(volume.unwrap_or(self.config.default_volume))?;
        let loop_enabled = loop_enabled.unwrap_or(self.config.default_loop);
        let record = self.resolve(device_name)?;

        let this = Arc::clone(self);
        let device_name = device_name.to_string();
        self.run_transition(async move {
            this.play_locked(&device_name, record, volume, loop_enabled)
                .await
        })
        .await
    }

    async fn play_locked(
        &self,
        device_name: &str,
        record: DeviceRecord,
        volume: f32,
        loop_enabled: bool,
    ) -> CastLoopResult<()> {
        let mut sessions = self.sessions.lock().await;

        // Every other session first, then a restart of this device's own.
        let mut names: Vec<String> = sessions.keys().cloned().collect();
        names.sort_by_key(|name| name == device_name);
        for name in names {
            if let Some(session) = sessions.remove(&name) {
                if name == device_name {
                    log::info!("[Controller] Restarting session on {}", name);
                } else {
                    log::info!("[Controller] Stopping session on {} for {}", name, device_name);
                }
                session.stop_and_join().await;
            }
        }
        *self.active.write() = None;

        let client = self.connector.connect(&record);
        if let Err(e) = self.prepare_device(client.as_ref(), device_name, volume).await {
            log::warn!(
                "[Controller] Preparing {} failed ({}): {}",
                device_name,
                e.code(),
                e
            );
            return Err(e.into());
        }

        let stream_url = self.network.stream_url();
        let session = PlaybackSession::start(
            device_name,
            client,
            stream_url,
            SessionOptions::from_config(&self.config, loop_enabled),
            &self.spawner,
            self.release_tx.clone(),
        );
        *self.active.write() = Some(ActiveMarker {
            device_name: device_name.to_string(),
            session_id: session.id(),
            phase: session.subscribe(),
        });
        sessions.insert(device_name.to_string(), session);

        log::info!(
            "[Controller] Playing on {} (volume={}, loop={})",
            device_name,
            volume,
            loop_enabled
        );
        Ok(())
    }

    /// Waits for readiness, quits the running app, lets it settle, sets volume.
    async fn prepare_device(
        &self,
        client: &dyn DeviceClient,
        device_name: &str,
        volume: f32,
    ) -> DeviceResult<()> {
        bounded("wait_ready", self.config.ready_timeout(), client.wait_ready()).await?;
        log::info!("[Controller] Quitting current app on {}", device_name);
        client.quit_app().await?;
        tokio::time::sleep(self.config.quit_settle()).await;
        client.set_volume(volume).await
    }

    /// Stops playback on `device_name`.
    ///
    /// A device without a session is not an error. If the device is visible
    /// its running app is quit either way.
    pub async fn stop(self: &Arc<Self>, device_name: &str) -> CastLoopResult<()> {
        let this = Arc::clone(self);
        let device_name = device_name.to_string();
        self.run_transition(async move { this.stop_locked(&device_name).await })
            .await
    }

    async fn stop_locked(&self, device_name: &str) -> CastLoopResult<()> {
        let mut sessions = self.sessions.lock().await;

        match sessions.remove(device_name) {
            Some(session) => {
                log::info!("[Controller] Stopping session on {}", device_name);
                session.stop_and_join().await;
            }
            None => log::debug!("[Controller] No session on {}", device_name),
        }
        self.clear_active(device_name);

        if let Some(record) = self.registry.lookup(device_name) {
            let client = self.connector.connect(&record);
            bounded("wait_ready", self.config.ready_timeout(), client.wait_ready()).await?;
            client.quit_app().await?;
        }
        Ok(())
    }

    /// Sets the volume of a visible device. Session state is untouched.
    pub async fn set_volume(&self, device_name: &str, volume: f32) -> CastLoopResult<()> {
        let volume = check_volume(volume)?;
        let record = self.resolve(device_name)?;
        let client = self.connector.connect(&record);

        bounded("wait_ready", self.config.ready_timeout(), client.wait_ready()).await?;
        log::info!("[Controller] Setting volume of {} to {}", device_name, volume);
        client.set_volume(volume).await?;
        Ok(())
    }

    /// Snapshot of visible devices and the active session.
    pub fn status(&self) -> ControllerStatus {
        let active = self.active.read();
        ControllerStatus {
            device_names: self.registry.snapshot(),
            active_device_name: active.as_ref().map(|m| m.device_name.clone()),
            active_phase: active.as_ref().map(|m| *m.phase.borrow()),
        }
    }

    /// Stops and joins every session. Used on shutdown.
    pub async fn stop_all(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let result = self
            .run_transition(async move {
                let mut sessions = this.sessions.lock().await;
                for (name, session) in sessions.drain() {
                    log::info!("[Controller] Stopping session on {}", name);
                    session.stop_and_join().await;
                }
                *this.active.write() = None;
                Ok(())
            })
            .await;
        if let Err(e) = result {
            log::warn!("[Controller] Stopping all sessions failed: {}", e);
        }
    }

    /// Runs a locked transition on its own task and waits for it.
    ///
    /// Dropping the returned future detaches the task instead of cancelling
    /// it, so the table is never left between states.
    async fn run_transition<T, F>(&self, transition: F) -> CastLoopResult<T>
    where
        F: Future<Output = CastLoopResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.spawner
            .spawn_joinable(transition)
            .await
            .map_err(|e| CastLoopError::Internal(format!("session transition aborted: {}", e)))?
    }

    /// Names of devices that currently own a session.
    pub async fn session_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(&self, device_name: &str) -> CastLoopResult<DeviceRecord> {
        self.registry
            .lookup(device_name)
            .ok_or_else(|| CastLoopError::DeviceNotFound(device_name.to_string()))
    }

    fn clear_active(&self, device_name: &str) {
        let mut active = self.active.write();
        if active.as_ref().is_some_and(|m| m.device_name == device_name) {
            log::debug!(
                "[Controller] Clearing active session {:?}",
                active.as_ref().map(|m| m.session_id)
            );
            *active = None;
        }
    }
}

fn check_volume(volume: f32) -> CastLoopResult<f32> {
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err(CastLoopError::InvalidRequest(format!(
            "volume must be between 0.0 and 1.0, got {}",
            volume
        )))
    }
}
