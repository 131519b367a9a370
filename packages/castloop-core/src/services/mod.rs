//! Application services layer.
//!
//! This module contains the session logic and the discovery lifecycle that
//! sit between the API layer and the device adapters.

pub mod discovery_service;
pub mod playback_session;
pub mod session_controller;

pub use discovery_service::DiscoveryService;
pub use playback_session::{PlaybackSession, SessionOptions, SessionPhase, SessionRelease};
pub use session_controller::{ControllerStatus, SessionController};
