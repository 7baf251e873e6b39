//! calcd: the calculator daemon.
//!
//! Serves the calculator service over gRPC, wrapping every call in the
//! tracing and metrics observers.

use std::path::PathBuf;

use clap::Parser;
use tonic::transport::Server;
use tracing::{info, warn};

use calcrpc::CalculatorService;
use calcrpc::server::config::Config;

/// Calculator gRPC service daemon.
#[derive(Parser)]
#[command(name = "calcd")]
#[command(version = calcrpc::PKG_VERSION)]
#[command(about = "Calculator gRPC service daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration.
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(address) = args.address {
        config.server.address = address;
        config.validate()?;
    }
    let addr = config.bind_address()?;

    info!(version = calcrpc::version_string(), %addr, "calcd starting");

    let service = CalculatorService::from_config(&config);
    let limits = &config.server.limits;

    let mut builder = Server::builder()
        .concurrency_limit_per_connection(limits.max_concurrent_requests);
    if let Some(timeout) = limits.request_timeout() {
        builder = builder.timeout(timeout);
    }

    builder
        .add_service(service.into_server())
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    info!("calcd stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "cannot listen for ctrl-c, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
