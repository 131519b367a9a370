//! Renderer discovery: listener capability plus the mDNS browser feeding it.

pub mod listener;
pub mod mdns;

use thiserror::Error;

pub use listener::{DiscoveryListener, RegistryListener};
pub use mdns::{parse_cast_service, MdnsBrowser};

/// Errors raised while starting or running discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The mDNS daemon could not be created or driven.
    #[error("mDNS daemon error: {0}")]
    MdnsDaemon(String),

    /// Browsing for the service type failed.
    #[error("mDNS browse failed: {0}")]
    Browse(String),
}
