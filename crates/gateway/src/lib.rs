// SPDX-License-Identifier: BUSL-1.1

//! Edge Gateway: a WebSocket message broker multiplexing prioritized work
//! between a cloud control plane and edge worker nodes.

pub mod config;
pub mod config_watch;
pub mod control;
pub mod dispatcher;
pub mod ingress;
pub mod semaphore;
pub mod state;
pub mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::config_watch::{ConfigEvent, ConfigWatcher};
use crate::dispatcher::InboundReply;
use crate::state::GatewayState;
use crate::transport::build_router;

/// Run the gateway until `shutdown` is cancelled.
///
/// If `config_path` is given, the file is watched for changes: hot fields
/// apply in place, restart-required changes are logged and otherwise
/// ignored (the operator must restart the process to pick them up).
///
/// `reply_handler`, if given, is the callback inbound node replies are
/// routed to (the "handler provided at construction" of the connection
/// dispatcher); a default handler that logs the reply is always installed
/// first, so replies are never silently dropped even with no caller-supplied
/// handler.
pub async fn run(
    config: GatewayConfig,
    config_path: Option<PathBuf>,
    reply_handler: Option<Arc<dyn Fn(&InboundReply) + Send + Sync>>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", config.port);
    let clock = edge_gateway_core::system_clock();
    let state = Arc::new(GatewayState::new(config.clone(), shutdown.clone(), clock));

    state.on_reply(|reply| {
        info!(
            node_id = %reply.node_id,
            message_id = %reply.message_id,
            channel_id = %reply.channel_id,
            "inbound reply"
        );
    });
    if let Some(handler) = reply_handler {
        state.on_reply(move |reply| handler(reply));
    }

    if let Some(path) = config_path {
        spawn_config_watch(Arc::clone(&state), path, config, shutdown.clone());
    }

    info!(%addr, "edge gateway listening");
    let router = build_router(Arc::clone(&state));
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}

/// Spawn the config file watcher and the task that applies its events to
/// live gateway state.
fn spawn_config_watch(
    state: Arc<GatewayState>,
    path: PathBuf,
    initial: GatewayConfig,
    shutdown: CancellationToken,
) {
    let watcher = ConfigWatcher::new(path, initial);
    let (event_tx, mut event_rx) = mpsc::channel::<ConfigEvent>(8);

    tokio::spawn(watcher.run(event_tx, shutdown.clone()));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        ConfigEvent::Updated { config, changed_fields } => {
                            info!(?changed_fields, "applying hot config reload");
                            *state.config.write() = config;
                        }
                        ConfigEvent::RestartRequired { changed_fields } => {
                            warn!(
                                ?changed_fields,
                                "config change requires a restart to take effect, ignoring"
                            );
                        }
                        ConfigEvent::Error { message } => {
                            warn!(message, "config reload failed, retaining current config");
                        }
                    }
                }
            }
        }
    });
}
