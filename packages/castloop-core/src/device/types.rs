//! Domain types for renderer devices and their media status.

use serde::Serialize;

/// Connection metadata for a discovered renderer.
///
/// Opaque to the session layer: only a [`DeviceConnector`](super::DeviceConnector)
/// looks inside it to build a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Stable protocol-level identifier (TXT `id`, or the DNS-SD full name).
    pub id: String,
    /// Human-readable name shown in the UI; the registry key.
    pub friendly_name: String,
    /// Address the control channel connects to.
    pub host: String,
    /// Control channel port.
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A registry entry: friendly name plus the connection metadata behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Unique, stable registry key.
    pub name: String,
    /// Connection metadata handed to the device connector.
    pub info: DeviceInfo,
}

impl DeviceRecord {
    /// Builds a record keyed by the device's friendly name.
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            name: info.friendly_name.clone(),
            info,
        }
    }
}

/// Player state reported by a renderer's media channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Buffering,
    /// No media session is known yet.
    #[default]
    Unknown,
}

impl PlayerState {
    /// Whether the renderer has an active media session.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::Buffering)
    }
}

/// Why a renderer's player went idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdleReason {
    Cancelled,
    Interrupted,
    Finished,
    Error,
}

/// Snapshot of a renderer's media status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatus {
    pub player_state: PlayerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_reason: Option<IdleReason>,
}

impl MediaStatus {
    pub fn new(player_state: PlayerState, idle_reason: Option<IdleReason>) -> Self {
        Self {
            player_state,
            idle_reason,
        }
    }

    /// Status of a renderer with no media session.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Whether the media reached its natural end (`IDLE` / `FINISHED`).
    pub fn finished_naturally(&self) -> bool {
        self.player_state == PlayerState::Idle && self.idle_reason == Some(IdleReason::Finished)
    }
}
