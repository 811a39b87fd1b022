//! Portico payment gateway HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p portico-gateway --release
//!
//! # Run with custom config path
//! CONFIG=/path/to/config.toml cargo run -p portico-gateway
//!
//! # Return normalized requests without calling the provider
//! cargo run -p portico-gateway -- --echo
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p portico-gateway
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST` - Override bind address (default: `0.0.0.0`)
//! - `PORT` - Override port (default: `8000`)
//! - `ECHO` - Override echo mode
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use portico_http::HttpGatewayFactory;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

use portico_gateway::config::GatewayConfig;
use portico_gateway::handlers::{AppState, gateway_router};
use portico_gateway::telemetry;
use portico_gateway::util::SigDown;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Return normalized requests instead of executing them.
    #[arg(long)]
    echo: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    telemetry::init();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Gateway failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = GatewayConfig::load_from(&args.config)?;
    config.echo |= args.echo;
    tracing::info!(
        host = %config.host,
        port = config.port,
        route_prefix = %config.route_prefix,
        echo = config.echo,
        "Loaded configuration"
    );
    if config.echo {
        tracing::warn!("Echo mode enabled: requests are returned without reaching the provider");
    }

    let factory = HttpGatewayFactory::new().with_timeout(config.provider_timeout());
    let operations = TaskTracker::new();
    let state = AppState::new(factory, &config, operations.clone());

    let app = gateway_router(state, &config.route_prefix).layer(TraceLayer::new_for_http());

    let sig_down = SigDown::try_new()?;

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Gateway listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { sig_down.recv().await })
        .await?;

    SigDown::drain(&operations).await;
    tracing::info!("Gateway shut down gracefully");
    Ok(())
}
