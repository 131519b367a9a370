//! Playback session: one continuous, possibly looping, run on a single renderer.
//!
//! Each session owns a watchdog task. The watchdog starts playback, waits for
//! the renderer to report an active media session, then polls status at a
//! fixed interval and replays the media whenever it finishes naturally.
//!
//! # Lifecycle
//!
//! ```text
//! STARTING ──► ACTIVE ──► STOPPING ──► STOPPED
//!               │  ▲
//!               └──┘ replay on IDLE/FINISHED
//! ```
//!
//! Stopping is cooperative: [`PlaybackSession::request_stop`] cancels a token
//! that the watchdog checks at every suspension point. An in-flight device
//! call is never aborted. The owner must [`PlaybackSession::stop_and_join`]
//! before any other task commands the same renderer.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::device::{bounded, DeviceClient, DeviceResult, MediaStatus, PlayerState};
use crate::runtime::TokioSpawner;
use crate::state::SessionConfig;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Starting,
    Active,
    Stopping,
    /// Terminal.
    Stopped,
}

/// Watchdog tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub loop_enabled: bool,
    pub content_type: String,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub activation_timeout: Duration,
}

impl SessionOptions {
    pub fn from_config(config: &SessionConfig, loop_enabled: bool) -> Self {
        Self {
            loop_enabled,
            content_type: config.content_type.clone(),
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
            activation_timeout: config.activation_timeout(),
        }
    }
}

/// Sent by a watchdog that stopped on its own because of a device failure.
///
/// Carries the session id so a late notice never removes a newer session
/// for the same device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRelease {
    pub session_id: Uuid,
    pub device_name: String,
}

/// Handle to a running session and its watchdog.
pub struct PlaybackSession {
    id: Uuid,
    device_name: String,
    cancel: CancellationToken,
    phase: Arc<watch::Sender<SessionPhase>>,
    watchdog: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Spawns the watchdog and returns immediately in `STARTING`.
    ///
    /// # Arguments
    /// * `device_name` - Registry name of the renderer
    /// * `client` - Client bound to that renderer; borrowed for the watchdog's lifetime
    /// * `stream_url` - URL the renderer fetches the media from
    /// * `options` - Loop flag and timing
    /// * `spawner` - Runtime hosting the watchdog task
    /// * `release_tx` - Where a failed watchdog announces itself
    pub fn start(
        device_name: impl Into<String>,
        client: Arc<dyn DeviceClient>,
        stream_url: impl Into<String>,
        options: SessionOptions,
        spawner: &TokioSpawner,
        release_tx: mpsc::UnboundedSender<SessionRelease>,
    ) -> Self {
        let id = Uuid::new_v4();
        let device_name = device_name.into();
        let stream_url = stream_url.into();
        let cancel = CancellationToken::new();
        let (phase, _) = watch::channel(SessionPhase::Starting);
        let phase = Arc::new(phase);

        log::info!(
            "[Session] Starting {} on {} (loop={}): {}",
            id,
            device_name,
            options.loop_enabled,
            stream_url
        );

        let watchdog = Watchdog {
            session_id: id,
            device_name: device_name.clone(),
            client,
            stream_url,
            options,
            cancel: cancel.clone(),
            phase: Arc::clone(&phase),
            release_tx,
        };
        let handle = spawner.spawn_joinable(watchdog.run());

        Self {
            id,
            device_name,
            cancel,
            phase,
            watchdog: Some(handle),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Receiver for phase changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Asks the watchdog to wind down at its next suspension point.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Requests a stop and waits until the watchdog has fully exited.
    pub async fn stop_and_join(mut self) {
        self.request_stop();
        if let Some(handle) = self.watchdog.take() {
            if let Err(e) = handle.await {
                log::warn!(
                    "[Session] Watchdog for {} did not exit cleanly: {}",
                    self.device_name,
                    e
                );
            }
        }
        self.phase.send_replace(SessionPhase::Stopped);
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        // An unjoined session must not keep commanding the renderer.
        self.cancel.cancel();
    }
}

/// State owned by the watchdog task.
struct Watchdog {
    session_id: Uuid,
    device_name: String,
    client: Arc<dyn DeviceClient>,
    stream_url: String,
    options: SessionOptions,
    cancel: CancellationToken,
    phase: Arc<watch::Sender<SessionPhase>>,
    release_tx: mpsc::UnboundedSender<SessionRelease>,
}

impl Watchdog {
    async fn run(self) {
        let result = self.drive().await;
        self.set_phase(SessionPhase::Stopped);

        match result {
            Ok(()) => log::info!("[Session] {} on {} stopped", self.session_id, self.device_name),
            Err(e) => {
                log::warn!(
                    "[Session] Watchdog for {} failed, releasing session: {}",
                    self.device_name,
                    e
                );
                let release = SessionRelease {
                    session_id: self.session_id,
                    device_name: self.device_name.clone(),
                };
                if self.release_tx.send(release).is_err() {
                    log::debug!("[Session] Release channel closed");
                }
            }
        }
    }

    async fn drive(&self) -> DeviceResult<()> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        let mut last = MediaStatus::unknown();
        if self.activate().await? && self.pause(self.options.settle_delay).await {
            self.set_phase(SessionPhase::Active);
            log::info!("[Session] {} is active", self.device_name);
            last = self.monitor().await?;
        }

        self.set_phase(SessionPhase::Stopping);
        if last.player_state == PlayerState::Idle {
            log::debug!("[Session] {} already idle, skipping stop", self.device_name);
            return Ok(());
        }
        self.client.stop().await
    }

    /// Issues play and waits (bounded) for activation.
    ///
    /// Returns `false` if a stop was requested during the wait.
    async fn activate(&self) -> DeviceResult<bool> {
        self.client
            .play(&self.stream_url, &self.options.content_type)
            .await?;

        let activation = bounded(
            "block_until_active",
            self.options.activation_timeout,
            self.client.block_until_active(),
        );
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(false),
            result = activation => result?,
        }
        Ok(true)
    }

    /// Polls until stopped; returns the last status observed.
    async fn monitor(&self) -> DeviceResult<MediaStatus> {
        let mut last = MediaStatus::unknown();

        while !self.cancel.is_cancelled() {
            last = self.client.status().await?;
            log::debug!(
                "[Session] {} status: {:?} ({:?})",
                self.device_name,
                last.player_state,
                last.idle_reason
            );

            if self.options.loop_enabled && last.finished_naturally() {
                log::info!("[Session] {} finished, replaying", self.device_name);
                if !self.activate().await? {
                    return Ok(MediaStatus::unknown());
                }
                last = MediaStatus::unknown();
            }

            if !self.pause(self.options.poll_interval).await {
                break;
            }
        }

        Ok(last)
    }

    /// Sleeps for `duration`; `false` if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
    }
}
