//! Castloop Core - shared library for the castloop server.
//!
//! Discovers Cast renderers on the local network and drives exactly one
//! looping audio session at a time across them, with remote volume control.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`context`]: Network configuration and stream URL building
//! - [`state`]: Core configuration and session tunables
//! - [`device`]: Device registry, control capability and the Cast adapter
//! - [`discovery`]: Discovery listener and the mDNS browser feeding it
//! - [`services`]: Playback sessions, the session controller and discovery lifecycle
//! - [`api`]: HTTP router and server startup
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`DeviceClient`](device::DeviceClient): Remote operations on one renderer
//! - [`DeviceConnector`](device::DeviceConnector): Building clients from registry records
//! - [`DiscoveryListener`](discovery::DiscoveryListener): Add/update/remove notifications
//! - [`IpDetector`](context::IpDetector): Local IP detection

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod context;
pub mod device;
pub mod discovery;
pub mod error;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;

// Re-export commonly used types at the crate root
pub use context::{IpDetector, LocalIpDetector, NetworkContext, NetworkError, UrlBuilder};
pub use error::{CastLoopError, CastLoopResult, ErrorCode};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{Config, SessionConfig};

// Re-export device types
pub use device::{
    CastClient, CastConnector, DeviceClient, DeviceConnector, DeviceError, DeviceInfo,
    DeviceRecord, DeviceRegistry, IdleReason, MediaStatus, PlayerState,
};

// Re-export discovery types
pub use discovery::{DiscoveryError, DiscoveryListener, MdnsBrowser, RegistryListener};

// Re-export service types
pub use services::{
    ControllerStatus, DiscoveryService, PlaybackSession, SessionController, SessionPhase,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, bootstrap_services_with_network, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
