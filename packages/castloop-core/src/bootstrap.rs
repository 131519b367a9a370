//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the single place where the
//! registry, discovery, device connector and session controller are
//! instantiated and wired together.

use std::sync::Arc;

use crate::api::AppState;
use crate::context::{LocalIpDetector, NetworkContext};
use crate::device::{CastConnector, DeviceConnector, DeviceRegistry};
use crate::error::{CastLoopError, CastLoopResult};
use crate::runtime::TokioSpawner;
use crate::services::{DiscoveryService, SessionController};
use crate::state::Config;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Renderers currently visible on the network.
    pub registry: Arc<DeviceRegistry>,
    /// Keeps the registry in sync via mDNS.
    pub discovery_service: Arc<DiscoveryService>,
    /// Single-session playback control.
    pub controller: Arc<SessionController>,
    /// Network configuration (port, local IP).
    pub network: NetworkContext,
    pub config: Config,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
}

impl BootstrappedServices {
    /// Starts discovery if enabled.
    ///
    /// # Errors
    /// Returns an error if the mDNS daemon cannot be created.
    pub fn start_background_tasks(&self) -> CastLoopResult<()> {
        if self.config.discovery_mdns {
            self.discovery_service.start()?;
        } else {
            log::warn!("[Bootstrap] mDNS discovery disabled; no devices will appear");
        }
        Ok(())
    }

    /// Builds the state handed to the HTTP router.
    pub fn app_state(&self) -> AppState {
        AppState::new(
            Arc::clone(&self.controller),
            Arc::clone(&self.registry),
            self.network.clone(),
            self.config.clone(),
        )
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.controller.stop_all().await;
        self.discovery_service.shutdown().await;

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps services with an auto-detected network address.
pub fn bootstrap_services(config: &Config) -> CastLoopResult<BootstrappedServices> {
    let network = NetworkContext::auto_detect(config.preferred_port, LocalIpDetector::arc());
    bootstrap_services_with_network(config, network)
}

/// Bootstraps services with an explicit network context and the Cast connector.
///
/// # Errors
/// Returns `Configuration` if `config` fails validation.
pub fn bootstrap_services_with_network(
    config: &Config,
    network: NetworkContext,
) -> CastLoopResult<BootstrappedServices> {
    bootstrap_with_connector(
        config,
        network,
        Arc::new(CastConnector::new()),
        TokioSpawner::current(),
    )
}

/// Wires every service around the given device connector.
///
/// The wiring order follows the dependencies:
///
/// 1. Registry (shared by discovery, controller and API)
/// 2. Discovery service (writes the registry)
/// 3. Session controller (reads the registry, commands devices)
pub fn bootstrap_with_connector(
    config: &Config,
    network: NetworkContext,
    connector: Arc<dyn DeviceConnector>,
    spawner: TokioSpawner,
) -> CastLoopResult<BootstrappedServices> {
    config.validate().map_err(CastLoopError::Configuration)?;

    let registry = Arc::new(DeviceRegistry::new());

    let discovery_service = Arc::new(DiscoveryService::new(
        Arc::clone(&registry),
        config.mdns_service_type.clone(),
        spawner.clone(),
    ));

    let controller = SessionController::new(
        Arc::clone(&registry),
        connector,
        network.clone(),
        config.session.clone(),
        spawner.clone(),
    );

    Ok(BootstrappedServices {
        registry,
        discovery_service,
        controller,
        network,
        config: config.clone(),
        spawner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::test_support::{record, MockConnector};

    fn bootstrap(config: &Config) -> CastLoopResult<BootstrappedServices> {
        bootstrap_with_connector(
            config,
            NetworkContext::for_test(),
            Arc::new(MockConnector::new()),
            TokioSpawner::current(),
        )
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let mut config = Config::default();
        config.session.poll_interval_ms = 0;

        let err = bootstrap(&config).err().unwrap();
        assert!(matches!(err, CastLoopError::Configuration(_)));
    }

    #[tokio::test]
    async fn services_share_one_registry() {
        let services = bootstrap(&Config::default()).unwrap();
        services.registry.upsert(record("Kitchen"));

        let state = services.app_state();
        assert_eq!(state.registry.snapshot(), vec!["Kitchen"]);
        assert_eq!(services.controller.status().device_names, vec!["Kitchen"]);
        assert!(Arc::ptr_eq(
            services.discovery_service.registry(),
            &services.registry
        ));
    }

    #[tokio::test]
    async fn discovery_can_be_disabled() {
        let config = Config {
            discovery_mdns: false,
            ..Config::default()
        };
        let services = bootstrap(&config).unwrap();

        services.start_background_tasks().unwrap();
        assert!(!services.discovery_service.is_running());

        services.shutdown().await;
    }
}
