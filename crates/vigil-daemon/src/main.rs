//! Vigil Daemon - telemetry ingestion and anomaly detection service
//!
//! The Vigil daemon provides:
//! - REST API for submitting device readings
//! - Rolling averages and z-score anomaly detection per device
//! - Prometheus metrics export

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigil_daemon::error::{DaemonError, DaemonResult};
use vigil_daemon::{DaemonConfig, Server};

/// Vigil Daemon CLI
#[derive(Parser)]
#[command(name = "vigild")]
#[command(about = "Vigil Daemon - telemetry ingestion and anomaly detection", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VIGIL_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "VIGIL_LISTEN_ADDR")]
    listen: Option<String>,

    /// Listen port on all interfaces, used when no listen address is given
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(long, env = "VIGIL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "VIGIL_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    } else if let Some(port) = cli.port {
        config.server.listen_addr.set_port(port);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        mirror = ?config.mirror,
        "Starting Vigil daemon"
    );
    tracing::info!("  POST /api/metrics     - Submit device metrics");
    tracing::info!("  GET  /api/analyze     - Rolling average for a device");
    tracing::info!("  GET  /api/anomalies   - Drain analytics results");
    tracing::info!("  GET  /api/health      - Health check");
    tracing::info!("  GET  /api/prometheus  - Prometheus metrics");

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
