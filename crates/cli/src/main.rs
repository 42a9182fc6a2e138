// SPDX-License-Identifier: BUSL-1.1

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;

use edge_gateway::config::GatewayConfig;

/// Optional path to a config file that, when given, is watched for
/// hot-reloadable changes while the gateway runs.
#[derive(Debug, Parser)]
#[command(name = "edge-gatewayd", version, about = "Edge Gateway: WebSocket message broker for edge worker nodes.")]
struct Cli {
    #[command(flatten)]
    config: GatewayConfig,

    /// Path to a JSON config file to watch for hot reload.
    #[arg(long, env = "EDGE_GATEWAY_CONFIG_FILE")]
    config_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_signal.cancel();
    });

    if let Err(e) = edge_gateway::run(cli.config, cli.config_file, None, shutdown).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
