//! Core configuration types.
//!
//! [`Config`] holds everything the core needs to wire services together;
//! [`SessionConfig`] groups the timing and default parameters that drive
//! the session controller and its watchdogs.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    CAST_SERVICE_TYPE, DEFAULT_ACTIVATION_TIMEOUT_MS, DEFAULT_CONTENT_TYPE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_QUIT_SETTLE_MS, DEFAULT_READY_TIMEOUT_MS, DEFAULT_SETTLE_DELAY_MS, DEFAULT_VOLUME,
};

/// Configuration for playback sessions and device commands.
///
/// One "time unit" in the session state machine is `poll_interval_ms`; the
/// settle delay after activation is two of them by default.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Volume applied when a play request omits one (0.0 - 1.0).
    pub default_volume: f32,

    /// Whether sessions loop when a play request omits the flag.
    pub default_loop: bool,

    /// MIME type announced to renderers for the looped media.
    pub content_type: String,

    /// Interval between watchdog status polls (milliseconds).
    pub poll_interval_ms: u64,

    /// Pause after the renderer reports active, before polling (milliseconds).
    pub settle_delay_ms: u64,

    /// Pause after quitting the renderer's current app (milliseconds).
    pub quit_settle_ms: u64,

    /// Upper bound on waiting for the renderer to report active (milliseconds).
    pub activation_timeout_ms: u64,

    /// Upper bound on waiting for the renderer to accept commands (milliseconds).
    pub ready_timeout_ms: u64,
}

impl SessionConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err("default_volume must be within 0.0..=1.0".to_string());
        }
        if self.content_type.trim().is_empty() {
            return Err("content_type must not be empty".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be >= 1".to_string());
        }
        if self.activation_timeout_ms == 0 {
            return Err("activation_timeout_ms must be >= 1".to_string());
        }
        if self.ready_timeout_ms == 0 {
            return Err("ready_timeout_ms must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn quit_settle(&self) -> Duration {
        Duration::from_millis(self.quit_settle_ms)
    }

    pub fn activation_timeout(&self) -> Duration {
        Duration::from_millis(self.activation_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
            default_loop: true,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            quit_settle_ms: DEFAULT_QUIT_SETTLE_MS,
            activation_timeout_ms: DEFAULT_ACTIVATION_TIMEOUT_MS,
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
        }
    }
}

/// Configuration for the castloop core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP server (0 = auto-allocate).
    pub preferred_port: u16,

    /// Audio file served at the stream endpoint and looped on the renderer.
    pub media_file: PathBuf,

    /// Optional directory of static UI assets served as the router fallback.
    pub static_dir: Option<PathBuf>,

    // Discovery
    /// Enable mDNS/DNS-SD discovery.
    pub discovery_mdns: bool,

    /// DNS-SD service type browsed for renderers.
    pub mdns_service_type: String,

    // Sessions
    /// Session timing and defaults.
    pub session: SessionConfig,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.mdns_service_type.is_empty() || !self.mdns_service_type.ends_with('.') {
            return Err("mdns_service_type must be a fully-qualified name ending in '.'".into());
        }
        self.session.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 8000,
            media_file: PathBuf::from("whitenoise.aac"),
            static_dir: None,
            discovery_mdns: true,
            mdns_service_type: CAST_SERVICE_TYPE.to_string(),
            session: SessionConfig::default(),
        }
    }
}
