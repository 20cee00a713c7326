//! Edge request guard.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                    EDGE GUARD                    │
//!                        │                                                  │
//!   Client Request       │  ┌─────────┐   ┌───────────┐   ┌─────────────┐  │
//!   ─────────────────────┼─▶│  http   │──▶│ detection │──▶│   filters   │  │
//!                        │  │ server  │   │ counters  │   │ geo/asn/ua/ │  │
//!                        │  └─────────┘   └─────┬─────┘   │    rate     │  │
//!                        │                      │         └──────┬──────┘  │
//!                        │                      ▼                │         │
//!                        │                ┌──────────┐           │ pass    │
//!                        │                │  notify  │           ▼         │
//!   403 / 429 / origin   │                │ telegram │     ┌───────────┐   │
//!   ◀────────────────────┼────────────────┴──────────┴─────│  forward  │───┼──▶ Origin
//!                        │                                 └───────────┘   │
//!                        │  ┌────────────────────────────────────────────┐  │
//!                        │  │ store (redis | memory) · asn cache · config │  │
//!                        │  │ observability · lifecycle                   │  │
//!                        │  └────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use edge_guard::config::load_config;
use edge_guard::http::HttpServer;
use edge_guard::lifecycle::{build_guard, trigger_on_ctrl_c, Shutdown};
use edge_guard::observability::{init_logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "edge-guard", version, about = "Edge request classification and rate limiting")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("edge-guard: {}", e);
            std::process::exit(2);
        }
    };
    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    init_logging(&config.observability);
    tracing::info!("edge-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.origin.url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let guard = build_guard(&config, shutdown.subscribe()).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, guard)?;
    let serving = server.run(listener, shutdown.subscribe());
    tokio::pin!(serving);

    tokio::select! {
        result = &mut serving => result?,
        _ = trigger_on_ctrl_c(&shutdown) => serving.await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
