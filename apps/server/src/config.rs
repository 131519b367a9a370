//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use castloop_core::SessionConfig;
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `CASTLOOP_BIND_PORT`
    pub bind_port: u16,

    /// IP address embedded in stream URLs.
    /// This should be the IP that renderers can reach.
    /// If not specified, auto-detection will be attempted.
    /// Override: `CASTLOOP_ADVERTISE_IP`
    pub advertise_ip: Option<IpAddr>,

    /// Audio file served at `/stream`.
    /// Override: `CASTLOOP_MEDIA_FILE`
    pub media_file: PathBuf,

    /// Directory of static UI assets.
    pub static_dir: Option<PathBuf>,

    /// Enable mDNS/Bonjour discovery.
    pub discovery_mdns: bool,

    /// Session defaults and watchdog timing.
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_port: 8000,
            advertise_ip: None,
            media_file: PathBuf::from("whitenoise.aac"),
            static_dir: None,
            discovery_mdns: true,
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `CASTLOOP_*` overrides read through `lookup`.
    ///
    /// Unparseable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("CASTLOOP_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }

        if let Some(ip) = lookup("CASTLOOP_ADVERTISE_IP").and_then(|v| v.parse().ok()) {
            self.advertise_ip = Some(ip);
        }

        if let Some(path) = lookup("CASTLOOP_MEDIA_FILE").filter(|v| !v.is_empty()) {
            self.media_file = PathBuf::from(path);
        }
    }

    /// Converts to castloop-core's Config type.
    pub fn to_core_config(&self) -> castloop_core::Config {
        castloop_core::Config {
            preferred_port: self.bind_port,
            media_file: self.media_file.clone(),
            static_dir: self.static_dir.clone(),
            discovery_mdns: self.discovery_mdns,
            session: self.session.clone(),
            ..Default::default()
        }
    }
}
