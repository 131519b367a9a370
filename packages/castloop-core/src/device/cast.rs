//! Cast v2 adapter implementing [`DeviceClient`] on top of `rust_cast`.
//!
//! `rust_cast` speaks the protocol over a blocking TLS socket, so every
//! command opens a fresh connection inside `spawn_blocking`. Receiver and
//! media session ids survive between connections in [`CastSessionIds`].

use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_cast::channels::media::{self, Media, StreamType};
use rust_cast::channels::receiver::CastDeviceApp;
use rust_cast::CastDevice;

use super::traits::{DeviceClient, DeviceConnector};
use super::types::{DeviceInfo, DeviceRecord, IdleReason, MediaStatus, PlayerState};
use super::{DeviceError, DeviceResult};
use crate::protocol_constants::CAST_RECEIVER_DESTINATION;

/// Interval between status reads while waiting for activation.
const ACTIVATION_POLL: Duration = Duration::from_millis(250);

/// Ids learned from the receiver, needed to address the media session.
#[derive(Debug, Default)]
struct CastSessionIds {
    /// Receiver application session (from `launch_app`).
    session_id: Option<String>,
    /// Transport the media namespace is addressed to.
    transport_id: Option<String>,
    /// Media session created by `load`.
    media_session_id: Option<i32>,
}

impl CastSessionIds {
    fn clear(&mut self) {
        self.session_id = None;
        self.transport_id = None;
        self.media_session_id = None;
    }
}

/// Ensures the rustls crypto provider is installed exactly once.
fn ensure_crypto_provider() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Err means another component already installed one; that is fine.
        let _ = rustls::crypto::CryptoProvider::install_default(
            rustls::crypto::aws_lc_rs::default_provider(),
        );
    });
}

/// Client for one Cast renderer.
#[derive(Clone, Debug)]
pub struct CastClient {
    name: String,
    host: String,
    port: u16,
    ids: Arc<Mutex<CastSessionIds>>,
}

impl CastClient {
    pub fn new(info: &DeviceInfo) -> Self {
        log::debug!(
            "[Cast] Creating client for {} at {}:{}",
            info.friendly_name,
            info.host,
            info.port
        );
        Self {
            name: info.friendly_name.clone(),
            host: info.host.clone(),
            port: info.port,
            ids: Arc::new(Mutex::new(CastSessionIds::default())),
        }
    }

    /// Opens a connection to the platform receiver and runs `op` on a blocking worker.
    async fn run_blocking<T, F>(&self, action: &'static str, op: F) -> DeviceResult<T>
    where
        F: FnOnce(&CastDevice<'static>) -> DeviceResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let host = self.host.clone();
        let port = self.port;
        log::trace!("[Cast] {} -> {}", action, self.name);

        tokio::task::spawn_blocking(move || {
            ensure_crypto_provider();
            let device = CastDevice::connect_without_host_verification(host, port)
                .map_err(|e| DeviceError::Connect(e.to_string()))?;
            device
                .connection
                .connect(CAST_RECEIVER_DESTINATION)
                .map_err(|e| DeviceError::command(action, e))?;
            op(&device)
        })
        .await
        .map_err(|e| DeviceError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl DeviceClient for CastClient {
    async fn wait_ready(&self) -> DeviceResult<()> {
        self.run_blocking("wait_ready", |device| {
            device
                .receiver
                .get_status()
                .map(|_| ())
                .map_err(|e| DeviceError::command("wait_ready", e))
        })
        .await
    }

    async fn play(&self, url: &str, content_type: &str) -> DeviceResult<()> {
        let ids = Arc::clone(&self.ids);
        let media = Media {
            content_id: url.to_string(),
            content_type: content_type.to_string(),
            stream_type: StreamType::Buffered,
            metadata: None,
            duration: None,
        };

        self.run_blocking("play", move |device| {
            let app = device
                .receiver
                .launch_app(&CastDeviceApp::DefaultMediaReceiver)
                .map_err(|e| DeviceError::command("launch_app", e))?;
            device
                .connection
                .connect(app.transport_id.clone())
                .map_err(|e| DeviceError::command("play", e))?;

            let status = device
                .media
                .load(app.transport_id.clone(), app.session_id.clone(), &media)
                .map_err(|e| DeviceError::command("play", e))?;

            let mut ids = ids.lock();
            ids.session_id = Some(app.session_id);
            ids.transport_id = Some(app.transport_id);
            ids.media_session_id = status.entries.first().map(|e| e.media_session_id);
            Ok(())
        })
        .await
    }

    async fn block_until_active(&self) -> DeviceResult<()> {
        loop {
            if self.status().await?.player_state.is_active() {
                return Ok(());
            }
            tokio::time::sleep(ACTIVATION_POLL).await;
        }
    }

    async fn status(&self) -> DeviceResult<MediaStatus> {
        let Some(transport_id) = self.ids.lock().transport_id.clone() else {
            return Ok(MediaStatus::unknown());
        };
        let ids = Arc::clone(&self.ids);

        self.run_blocking("status", move |device| {
            device
                .connection
                .connect(transport_id.clone())
                .map_err(|e| DeviceError::command("status", e))?;
            let status = device
                .media
                .get_status(transport_id, None)
                .map_err(|e| DeviceError::command("status", e))?;

            let Some(entry) = status.entries.first() else {
                return Ok(MediaStatus::unknown());
            };
            ids.lock().media_session_id = Some(entry.media_session_id);
            Ok(MediaStatus::new(
                map_player_state(&entry.player_state),
                entry.idle_reason.as_ref().map(map_idle_reason),
            ))
        })
        .await
    }

    async fn stop(&self) -> DeviceResult<()> {
        let (transport_id, media_session_id) = {
            let ids = self.ids.lock();
            (ids.transport_id.clone(), ids.media_session_id)
        };
        let (Some(transport_id), Some(media_session_id)) = (transport_id, media_session_id) else {
            log::debug!("[Cast] {}: no media session to stop", self.name);
            return Ok(());
        };

        self.run_blocking("stop", move |device| {
            device
                .connection
                .connect(transport_id.clone())
                .map_err(|e| DeviceError::command("stop", e))?;
            device
                .media
                .stop(transport_id, media_session_id)
                .map(|_| ())
                .map_err(|e| DeviceError::command("stop", e))
        })
        .await
    }

    async fn quit_app(&self) -> DeviceResult<()> {
        let ids = Arc::clone(&self.ids);

        self.run_blocking("quit_app", move |device| {
            let status = device
                .receiver
                .get_status()
                .map_err(|e| DeviceError::command("quit_app", e))?;
            for app in &status.applications {
                log::debug!("[Cast] Stopping receiver app {}", app.display_name);
                device
                    .receiver
                    .stop_app(app.session_id.clone())
                    .map_err(|e| DeviceError::command("quit_app", e))?;
            }
            ids.lock().clear();
            Ok(())
        })
        .await
    }

    async fn set_volume(&self, level: f32) -> DeviceResult<()> {
        let level = level.clamp(0.0, 1.0);
        self.run_blocking("set_volume", move |device| {
            device
                .receiver
                .set_volume(level)
                .map(|_| ())
                .map_err(|e| DeviceError::command("set_volume", e))
        })
        .await
    }
}

fn map_player_state(state: &media::PlayerState) -> PlayerState {
    match state {
        media::PlayerState::Idle => PlayerState::Idle,
        media::PlayerState::Playing => PlayerState::Playing,
        media::PlayerState::Paused => PlayerState::Paused,
        media::PlayerState::Buffering => PlayerState::Buffering,
    }
}

fn map_idle_reason(reason: &media::IdleReason) -> IdleReason {
    match reason {
        media::IdleReason::Cancelled => IdleReason::Cancelled,
        media::IdleReason::Interrupted => IdleReason::Interrupted,
        media::IdleReason::Finished => IdleReason::Finished,
        media::IdleReason::Error => IdleReason::Error,
    }
}

/// Builds [`CastClient`]s for registry records.
#[derive(Debug, Default, Clone)]
pub struct CastConnector;

impl CastConnector {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceConnector for CastConnector {
    fn connect(&self, record: &DeviceRecord) -> Arc<dyn DeviceClient> {
        Arc::new(CastClient::new(&record.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> DeviceInfo {
        DeviceInfo {
            id: "abc".into(),
            friendly_name: "Kitchen".into(),
            host: "192.168.1.20".into(),
            port: 8009,
            model: Some("Google Home".into()),
        }
    }

    #[test]
    fn maps_cast_player_states() {
        assert_eq!(map_player_state(&media::PlayerState::Idle), PlayerState::Idle);
        assert_eq!(
            map_player_state(&media::PlayerState::Buffering),
            PlayerState::Buffering
        );
        assert_eq!(
            map_idle_reason(&media::IdleReason::Finished),
            IdleReason::Finished
        );
    }

    #[tokio::test]
    async fn status_without_media_session_is_unknown() {
        let client = CastClient::new(&info());
        assert_eq!(client.status().await.unwrap(), MediaStatus::unknown());
    }

    #[tokio::test]
    async fn stop_without_media_session_is_noop() {
        let client = CastClient::new(&info());
        assert!(client.stop().await.is_ok());
    }

    #[test]
    fn clearing_ids_forgets_media_session() {
        let mut ids = CastSessionIds {
            session_id: Some("s".into()),
            transport_id: Some("t".into()),
            media_session_id: Some(3),
        };
        ids.clear();
        assert!(ids.session_id.is_none());
        assert!(ids.transport_id.is_none());
        assert!(ids.media_session_id.is_none());
    }
}
