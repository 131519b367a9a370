//! Centralized error types for the castloop core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Classifies errors for the controller surface (not-found vs bad-request)
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::context::NetworkError;
use crate::device::DeviceError;
use crate::discovery::DiscoveryError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::MdnsDaemon(_) => "mdns_daemon_failed",
            Self::Browse(_) => "mdns_browse_failed",
        }
    }
}

impl ErrorCode for DeviceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "device_connect_failed",
            Self::Command { .. } => "device_command_failed",
            Self::Timeout { .. } => "device_timeout",
            Self::Worker(_) => "device_worker_failed",
        }
    }
}

/// Application-wide error type for castloop.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum CastLoopError {
    /// The named device is not currently visible in the registry.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A command issued to a renderer failed or timed out.
    #[error("Remote command failed: {0}")]
    RemoteCommand(String),

    /// Device discovery failed (mDNS daemon issues).
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Network-related error (IP detection, bind issues).
    #[error("Network error: {0}")]
    Network(String),

    /// Server configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CastLoopError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeviceNotFound(_) => "device_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::RemoteCommand(_) => "remote_command_failed",
            Self::Discovery(_) => "discovery_failed",
            Self::Network(_) => "network_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::RemoteCommand(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type CastLoopResult<T> = Result<T, CastLoopError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    error: &'static str,
    message: String,
}

impl IntoResponse for CastLoopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            status: "error",
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DeviceError> for CastLoopError {
    fn from(err: DeviceError) -> Self {
        Self::RemoteCommand(err.to_string())
    }
}

impl From<DiscoveryError> for CastLoopError {
    fn from(err: DiscoveryError) -> Self {
        Self::Discovery(err.to_string())
    }
}

impl From<NetworkError> for CastLoopError {
    fn from(err: NetworkError) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_not_found_maps_to_404() {
        let err = CastLoopError::DeviceNotFound("Kitchen".into());
        assert_eq!(err.code(), "device_not_found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_request_maps_to_400() {
        let err = CastLoopError::InvalidRequest("missing device_name".into());
        assert_eq!(err.code(), "invalid_request");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn device_timeout_becomes_remote_command_failure() {
        let err: CastLoopError = DeviceError::Timeout {
            action: "block_until_active",
            after_ms: 500,
        }
        .into();
        assert!(matches!(err, CastLoopError::RemoteCommand(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("block_until_active"));
    }

    #[test]
    fn device_error_codes_are_distinct() {
        let connect = DeviceError::Connect("refused".into());
        let command = DeviceError::Command {
            action: "quit_app",
            message: "boom".into(),
        };
        assert_eq!(connect.code(), "device_connect_failed");
        assert_eq!(command.code(), "device_command_failed");
    }
}
