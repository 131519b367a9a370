//! Network configuration context for the media server.
//!
//! This module provides [`NetworkContext`] which bundles the address that
//! renderers use to fetch the looped media. It supports both explicit
//! configuration (pinned advertise IP) and auto-detection.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::protocol_constants::{IP_PROBE_TARGET, STREAM_PATH};

/// Network configuration shared across services.
///
/// # Modes
///
/// - **Explicit**: the advertise IP is specified in configuration and never
///   re-detected. Use [`NetworkContext::explicit`].
/// - **Auto-detect**: the local IP is re-detected each time a stream URL is
///   built, so a changed DHCP lease is picked up by the next play request.
///   Use [`NetworkContext::auto_detect`].
#[derive(Clone)]
pub struct NetworkContext {
    /// Server port (initially 0 if auto-assigned, set when server starts).
    pub port: Arc<RwLock<u16>>,
    /// IP address that renderers can reach us at.
    pub local_ip: Arc<RwLock<String>>,
    /// IP detector for checking network changes (auto-detect mode only).
    ip_detector: Option<Arc<dyn IpDetector>>,
}

impl NetworkContext {
    /// Creates a `NetworkContext` with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `bind_port` - Port to bind the server to (0 for auto-assign).
    /// * `advertise_ip` - IP address that renderers can reach us at.
    #[must_use]
    pub fn explicit(bind_port: u16, advertise_ip: IpAddr) -> Self {
        Self {
            port: Arc::new(RwLock::new(bind_port)),
            local_ip: Arc::new(RwLock::new(advertise_ip.to_string())),
            ip_detector: None,
        }
    }

    /// Creates a `NetworkContext` with auto-detection.
    ///
    /// Initial detection never fails: an undetectable address falls back to
    /// loopback and is retried on every [`stream_url`](Self::stream_url) call.
    #[must_use]
    pub fn auto_detect(preferred_port: u16, ip_detector: Arc<dyn IpDetector>) -> Self {
        let local_ip = detect_or_loopback(ip_detector.as_ref());
        Self {
            port: Arc::new(RwLock::new(preferred_port)),
            local_ip: Arc::new(RwLock::new(local_ip)),
            ip_detector: Some(ip_detector),
        }
    }

    /// Creates a `NetworkContext` for testing with a fixed IP.
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::explicit(8000, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)))
    }

    /// Detects the current local IP address using the configured detector.
    ///
    /// Only available if created with [`NetworkContext::auto_detect`].
    pub fn detect_ip(&self) -> Result<String, NetworkError> {
        match &self.ip_detector {
            Some(detector) => detector.detect(),
            None => Err(NetworkError::NoDetector),
        }
    }

    /// Returns the current port value.
    #[must_use]
    pub fn get_port(&self) -> u16 {
        *self.port.read()
    }

    /// Returns the current local IP.
    #[must_use]
    pub fn get_local_ip(&self) -> String {
        self.local_ip.read().clone()
    }

    /// Sets the port once the listener is bound.
    pub fn set_port(&self, port: u16) {
        *self.port.write() = port;
    }

    /// Re-detects the local IP (auto-detect mode) and stores the result.
    ///
    /// Falls back to loopback when detection fails. A no-op in explicit mode.
    pub fn refresh_local_ip(&self) -> String {
        if let Some(detector) = &self.ip_detector {
            let ip = detect_or_loopback(detector.as_ref());
            *self.local_ip.write() = ip;
        }
        self.get_local_ip()
    }

    /// Returns a `UrlBuilder` for the current network configuration.
    #[must_use]
    pub fn url_builder(&self) -> UrlBuilder {
        UrlBuilder::new(self.get_local_ip(), self.get_port())
    }

    /// Returns the URL renderers fetch the looped media from.
    ///
    /// Re-detects the local address first, so each new session embeds the
    /// machine's current outbound-facing IP.
    #[must_use]
    pub fn stream_url(&self) -> String {
        let ip = self.refresh_local_ip();
        UrlBuilder::new(ip, self.get_port()).stream_url()
    }
}

/// Trait for detecting the local IP address.
///
/// Different environments may need different detection strategies.
/// This trait allows injecting the appropriate detector.
pub trait IpDetector: Send + Sync {
    /// Detects the local IP address.
    fn detect(&self) -> Result<String, NetworkError>;
}

/// Runs a detector, falling back to `127.0.0.1` on failure.
fn detect_or_loopback(detector: &dyn IpDetector) -> String {
    match detector.detect() {
        Ok(ip) => ip,
        Err(e) => {
            log::warn!("[Network] {}, falling back to loopback", e);
            Ipv4Addr::LOCALHOST.to_string()
        }
    }
}

/// Default IP detector.
///
/// Asks the OS which source address it would route a datagram from (the UDP
/// socket is connected but nothing is sent), then falls back to scanning
/// interfaces with `local-ip-address`.
#[derive(Debug, Clone, Default)]
pub struct LocalIpDetector;

impl LocalIpDetector {
    /// Creates a new `LocalIpDetector`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Creates a new `LocalIpDetector` wrapped in an Arc.
    #[must_use]
    pub fn arc() -> Arc<dyn IpDetector> {
        Arc::new(Self::new())
    }

    fn outbound_route_ip() -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(IP_PROBE_TARGET)?;
        Ok(socket.local_addr()?.ip())
    }
}

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<String, NetworkError> {
        match Self::outbound_route_ip() {
            Ok(ip) if !ip.is_unspecified() => return Ok(ip.to_string()),
            Ok(_) => log::debug!("[Network] Route probe returned unspecified address"),
            Err(e) => log::debug!("[Network] Route probe failed: {}", e),
        }

        local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .map_err(|e| NetworkError::Detection(e.to_string()))
    }
}

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Could not detect local IP address.
    #[error("Failed to detect local IP: {0}")]
    Detection(String),

    /// No IP detector configured (explicit mode).
    #[error("No IP detector configured (using explicit mode)")]
    NoDetector,
}

/// Builder for constructing URLs served by this process.
pub struct UrlBuilder {
    ip: String,
    port: u16,
}

impl UrlBuilder {
    /// Creates a new `UrlBuilder` for the given server address.
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Returns the base URL for the server (e.g., `http://192.168.1.100:8000`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    /// Returns the media stream URL.
    #[must_use]
    pub fn stream_url(&self) -> String {
        format!("{}{}", self.base_url(), STREAM_PATH)
    }
}
