//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::context::NetworkContext;
use crate::device::DeviceRegistry;
use crate::services::SessionController;
use crate::state::Config;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind or serve on the TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// Holds references to services only; all business logic lives in them.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
    /// Discovered renderers.
    pub registry: Arc<DeviceRegistry>,
    /// Network configuration (port, local IP).
    pub network: NetworkContext,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        controller: Arc<SessionController>,
        registry: Arc<DeviceRegistry>,
        network: NetworkContext,
        config: Config,
    ) -> Self {
        Self {
            controller,
            registry,
            network,
            config: Arc::new(config),
        }
    }
}

/// Starts the HTTP server on the configured port (0 lets the OS pick one).
///
/// Records the bound port in the network context before serving, so stream
/// URLs handed to renderers always carry the real port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.preferred_port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let port = listener.local_addr()?.port();
    state.network.set_port(port);

    log::info!("[Server] Listening on http://0.0.0.0:{}", port);
    log::info!(
        "[Server] Renderers will fetch {}",
        state.network.url_builder().stream_url()
    );

    let app = http::create_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
