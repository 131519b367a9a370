//! Renderer devices: registry, control capability and protocol adapters.
//!
//! # Module Structure
//!
//! - `types` - Device records and media status
//! - `traits` - `DeviceClient` capability and `DeviceConnector` factory
//! - `registry` - Thread-safe name → record map fed by discovery
//! - `cast` - Cast v2 adapter built on `rust_cast`

pub mod cast;
pub mod registry;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

pub use cast::{CastClient, CastConnector};
pub use registry::DeviceRegistry;
pub use traits::{DeviceClient, DeviceConnector};
pub use types::{DeviceInfo, DeviceRecord, IdleReason, MediaStatus, PlayerState};

/// Errors raised by a [`DeviceClient`].
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Could not open the control channel.
    #[error("Failed to connect to device: {0}")]
    Connect(String),

    /// The renderer rejected or failed a command.
    #[error("{action} failed: {message}")]
    Command {
        action: &'static str,
        message: String,
    },

    /// A bounded wait on the renderer expired.
    #[error("{action} timed out after {after_ms}ms")]
    Timeout { action: &'static str, after_ms: u64 },

    /// The blocking worker running the command died.
    #[error("Device worker failed: {0}")]
    Worker(String),
}

impl DeviceError {
    pub(crate) fn command(action: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            action,
            message: err.to_string(),
        }
    }
}

/// Result alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Runs a device future with an upper bound, turning expiry into [`DeviceError::Timeout`].
pub async fn bounded<T, F>(
    action: &'static str,
    limit: std::time::Duration,
    fut: F,
) -> DeviceResult<T>
where
    F: std::future::Future<Output = DeviceResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeviceError::Timeout {
            action,
            after_ms: limit.as_millis() as u64,
        }),
    }
}
