//! Prometheus exporter for Tesla vehicle telemetry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use tesla_exporter::{
    ExporterConfig, ExporterState, HttpServer, TokenStore, VehicleApiClient, VehicleDataCache,
    VehiclePoller,
};

/// Prometheus exporter for Tesla vehicle telemetry.
#[derive(Parser, Debug)]
#[command(name = "tesla-exporter")]
#[command(about = "Export Tesla vehicle telemetry as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level or filter directive (overrides config).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    if let Some(listen) = args.listen {
        config.http.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    tesla_common::init_tracing(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        owner_url = %config.api.owner_url,
        data_file = %config.storage.vehicle_data_file.display(),
        "Starting Tesla exporter"
    );

    let listen_addr: SocketAddr = config
        .http
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.http.listen))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = Arc::new(ExporterState::new());
    let cache = VehicleDataCache::new(&config.storage.vehicle_data_file);
    let client = VehicleApiClient::new(
        &config.api,
        TokenStore::from_config(&config.storage),
        cache.clone(),
    )?;
    let poller = VehiclePoller::new(client, cache, state.clone(), &config);
    let http_server = HttpServer::new(state, listen_addr, config.polling.max_loop_age());

    let mut poller_task = tokio::spawn(poller.run());

    let http_shutdown = shutdown_rx.clone();
    let mut http_task = tokio::spawn(async move { http_server.run(http_shutdown).await });

    let mut poller_done = false;
    let mut http_done = false;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate_signal() => {
            info!("Received SIGTERM, shutting down...");
        }
        result = &mut poller_task => {
            poller_done = true;
            match result {
                Ok(Err(e)) => error!(error = %e, "Poller stopped"),
                Ok(Ok(())) => error!("Poller stopped unexpectedly"),
                Err(e) => error!(error = %e, "Poller task panicked"),
            }
        }
        result = &mut http_task => {
            http_done = true;
            match result {
                Ok(Err(e)) => error!(error = %e, "HTTP server stopped"),
                Ok(Ok(())) => error!("HTTP server stopped unexpectedly"),
                Err(e) => error!(error = %e, "HTTP server task panicked"),
            }
        }
    }

    shutdown_tx.send(true).ok();
    if !poller_done {
        poller_task.abort();
    }
    if !http_done {
        let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;
    }

    info!("Exporter stopped");
    if poller_done || http_done {
        anyhow::bail!("exporter terminated due to an error");
    }
    Ok(())
}

#[cfg(unix)]
async fn terminate_signal() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
