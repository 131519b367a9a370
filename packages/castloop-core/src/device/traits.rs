//! Trait abstractions for renderer control.
//!
//! These traits enable dependency injection for testability and modularity.
//! The session layer depends on [`DeviceClient`] rather than on a protocol
//! implementation; one adapter exists per control protocol.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{DeviceRecord, MediaStatus};
use super::DeviceResult;

/// Remote operations on a single renderer.
///
/// A client is bound to one device. Every call may fail with a transport or
/// command error. Calls that can block indefinitely on the device
/// (`wait_ready`, `block_until_active`) are bounded by the caller.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Waits until the renderer accepts commands.
    async fn wait_ready(&self) -> DeviceResult<()>;

    /// Starts playback of `url`, announced with `content_type`.
    ///
    /// # Arguments
    /// * `url` - The media URL the renderer should fetch
    /// * `content_type` - MIME type of the media
    async fn play(&self, url: &str, content_type: &str) -> DeviceResult<()>;

    /// Waits until the renderer reports an active media session.
    async fn block_until_active(&self) -> DeviceResult<()>;

    /// Reads the current player state and idle reason.
    async fn status(&self) -> DeviceResult<MediaStatus>;

    /// Stops the current media session.
    async fn stop(&self) -> DeviceResult<()>;

    /// Quits whatever application the renderer is running.
    async fn quit_app(&self) -> DeviceResult<()>;

    /// Sets the renderer volume.
    ///
    /// # Arguments
    /// * `level` - Volume level in `0.0..=1.0`
    async fn set_volume(&self, level: f32) -> DeviceResult<()>;
}

/// Builds a [`DeviceClient`] for a registry record.
///
/// Used by `SessionController` to turn a resolved name into a client handle.
pub trait DeviceConnector: Send + Sync {
    /// Returns a client bound to the device described by `record`.
    fn connect(&self, record: &DeviceRecord) -> Arc<dyn DeviceClient>;
}
