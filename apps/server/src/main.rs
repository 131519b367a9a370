//! Castloop Server - headless looped-audio casting server.
//!
//! Discovers Cast renderers on the LAN, serves a single audio file and keeps
//! it looping on whichever renderer the web UI selects.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use castloop_core::{
    bootstrap_services_with_network, start_server, LocalIpDetector, NetworkContext,
};
use clap::Parser;
use tokio::signal;

use crate::config::ServerConfig;

/// Castloop Server - loop an audio file on a Cast renderer.
#[derive(Parser, Debug)]
#[command(name = "castloop-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CASTLOOP_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "CASTLOOP_BIND_PORT")]
    port: Option<u16>,

    /// Advertise IP address (overrides config file).
    #[arg(short = 'a', long, env = "CASTLOOP_ADVERTISE_IP")]
    advertise_ip: Option<std::net::IpAddr>,

    /// Audio file to loop (overrides config file).
    #[arg(short = 'm', long, env = "CASTLOOP_MEDIA_FILE")]
    media_file: Option<PathBuf>,

    /// Directory of static UI assets.
    #[arg(short = 's', long, env = "CASTLOOP_STATIC_DIR")]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Castloop Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(ip) = args.advertise_ip {
        config.advertise_ip = Some(ip);
    }
    if let Some(media_file) = args.media_file {
        config.media_file = media_file;
    }
    if let Some(static_dir) = args.static_dir {
        config.static_dir = Some(static_dir);
    }

    if !config.media_file.is_file() {
        log::warn!(
            "Media file {} not found; /stream will return 404",
            config.media_file.display()
        );
    }

    // Resolve advertise IP: use explicit config, or fall back to auto-detection
    let network = if let Some(ip) = config.advertise_ip {
        log::info!(
            "Configuration: bind_port={}, advertise_ip={}",
            config.bind_port,
            ip
        );
        NetworkContext::explicit(config.bind_port, ip)
    } else {
        log::info!(
            "Configuration: bind_port={}, advertise_ip=auto",
            config.bind_port
        );
        NetworkContext::auto_detect(config.bind_port, LocalIpDetector::arc())
    };

    let core_config = config.to_core_config();
    let services = bootstrap_services_with_network(&core_config, network)
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    services
        .start_background_tasks()
        .context("Failed to start discovery")?;

    let app_state = services.app_state();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Stop every session (renderers are told to stop) before the server goes away.
    services.shutdown().await;

    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
