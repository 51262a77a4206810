//! pxy - Caching reverse proxy with per-resource TTLs

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, LoggingConfig};
use pxy_api::{AppState, create_router};
use pxy_core::{CacheStore, CacheTransport, ResourceTrie};
use pxy_proxy::UpstreamClient;

/// pxy - Caching reverse proxy with per-resource TTLs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (JSON or TOML)
    #[arg(short, long, default_value = "config/config.json")]
    config: String,

    /// Bind address
    #[arg(long, env = "PXY_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "PXY_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    init_logging(&config.logging, config.log_path.as_deref())?;

    info!("Starting pxy v{}", env!("CARGO_PKG_VERSION"));

    if config.metrics.enabled {
        let metrics_addr: SocketAddr = config
            .metrics
            .bind_address
            .parse()
            .with_context(|| format!("Invalid metrics address: {}", config.metrics.bind_address))?;
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }

    // Initialize cache store and its eviction worker
    let cache = CacheStore::new(config.cache_config());

    // Build resource trie
    let trie = Arc::new(ResourceTrie::build(
        config.default_target(),
        &config.resources,
    ));

    // Initialize upstream client
    let upstream = Arc::new(UpstreamClient::new(config.upstream.client_config())?);

    let transport = Arc::new(CacheTransport::new(cache, trie, upstream));
    let state = AppState::new(transport);

    // Create router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);
    info!("Upstream: {}://{}", config.target_scheme, config.target_host);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging, appending to `log_path` when set
fn init_logging(logging: &LoggingConfig, log_path: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let writer = match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let layer = if logging.format == "json" {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(log_path.is_none())
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
