#![forbid(unsafe_code)]

use clap::Parser;
use ratestore_lib::config::{load_from_path, Config};
use ratestore_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use ratestore_lib::{HttpClientPool, RateStore, StaticMembership, StaticOverrides};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream rate store for the ingestion front-end")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", env = "RATESTORE_CONFIG", default_value = "ratestore.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cfg.logging, &cfg.telemetry) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    info!(
        nodes = cfg.nodes.len(),
        tenants = cfg.tenants.len(),
        "configuration loaded"
    );

    if let Err(err) = run(cfg).await {
        error!(%err, "rate store exited with error");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let shutdown = CancellationToken::new();

    let (metrics, registry) = match cfg.telemetry.metrics_port {
        Some(_) => {
            let (metrics, registry) = init_metrics()?;
            (Some(metrics), Some(registry))
        }
        None => (None, None),
    };

    let store = Arc::new(RateStore::new(
        cfg.rate_store.clone(),
        Arc::new(StaticMembership::new(cfg.nodes.clone())),
        Arc::new(HttpClientPool::default()),
        Arc::new(StaticOverrides::new(cfg.tenants.clone())),
        metrics,
    ));

    let server = match (cfg.telemetry.metrics_port, registry) {
        (Some(port), Some(registry)) => {
            let store = Arc::clone(&store);
            let shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = start_observability_server(port, registry, store, shutdown).await {
                    error!(error = %e, "observability server failed");
                }
            }))
        }
        _ => None,
    };

    store.start_async(&shutdown)?;

    wait_for_signal().await?;

    if let Err(e) = store.stop_async() {
        warn!(error = %e, "rate store was not running at shutdown");
    }
    store.await_terminated().await;
    shutdown.cancel();

    if let Some(server) = server {
        let _ = server.await;
    }

    Ok(())
}

async fn wait_for_signal() -> std::io::Result<()> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
    }
    Ok(())
}
