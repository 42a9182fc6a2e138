// SPDX-License-Identifier: BUSL-1.1

//! Upstream WebSocket handler: one connection per edge worker node.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::dispatcher;
use crate::state::GatewayState;
use crate::transport::auth;
use crate::transport::frame::{Frame, SessionEventKind};

#[derive(Debug, Clone, Deserialize)]
pub struct NodeWsQuery {
    pub token: Option<String>,
}

/// `GET /ws/{node_id}` — WebSocket upgrade for an edge worker node.
pub async fn ws_handler(
    State(state): State<Arc<GatewayState>>,
    Path(node_id): Path<String>,
    Query(query): Query<NodeWsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let expected = state.config.read().nexus_api_key.clone();
    let query_str = query.token.as_ref().map(|t| format!("token={t}")).unwrap_or_default();
    if let Err(err) = auth::validate_ws_query(&query_str, expected.as_deref()) {
        return axum::http::Response::builder()
            .status(err.http_status())
            .body(axum::body::Body::from("unauthorized"))
            .unwrap_or_default()
            .into_response();
    }

    let Some(permit) = crate::semaphore::try_admit(&state.admission).await else {
        return axum::http::Response::builder()
            .status(503)
            .header("retry-after", "1")
            .body(axum::body::Body::from("no connection slots available"))
            .unwrap_or_default()
            .into_response();
    };

    ws.on_upgrade(move |socket| handle_ws(socket, state, node_id, permit)).into_response()
}

/// Per-connection handler: one reader loop and one writer loop, selected
/// concurrently until the node's cancellation token fires or the socket
/// closes.
async fn handle_ws(
    socket: WebSocket,
    state: Arc<GatewayState>,
    node_id: String,
    _permit: tokio::sync::OwnedSemaphorePermit,
) {
    let (wake_tx, mut wake_rx) = mpsc::channel(16);
    let entry = match dispatcher::accept_node(&state, &node_id, wake_tx) {
        Ok(entry) => entry,
        Err(err) => {
            warn!(node_id, %err, "rejected node connection");
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let cancel = entry.cancel.clone();
    let heartbeat_interval = state.config.read().health_check_interval();
    let mut heartbeat_check = tokio::time::interval(heartbeat_interval);
    heartbeat_check.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = heartbeat_check.tick() => {
                if heartbeat_missed(&state, &node_id, heartbeat_interval) {
                    warn!(node_id, "heartbeat missed, treating as a transport failure");
                    dispatcher::handle_transport_error(&state, &node_id);
                }
            }

            _ = wake_rx.recv() => {
                let drained = entry.lane_buffer.lock().drain();
                for message in drained {
                    dispatcher::track_dispatched(&state, &node_id, &message);
                    let frame = Frame::Dispatch { message };
                    let Ok(encoded) = frame.encode() else { continue };
                    if ws_tx.send(Message::Text(encoded.into())).await.is_err() {
                        dispatcher::handle_transport_error(&state, &node_id);
                        break;
                    }
                    dispatcher::handle_transport_success(&state, &node_id);
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound_frame(&state, &node_id, &text, &mut ws_tx).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => {
                        dispatcher::handle_transport_error(&state, &node_id);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    state.evict_node(&node_id);
    info!(node_id, "node disconnected");
}

/// A node has missed its heartbeat once it has gone silent for more than
/// three health-check intervals.
fn heartbeat_missed(state: &Arc<GatewayState>, node_id: &str, interval: std::time::Duration) -> bool {
    let Some(session) = state.sessions.lock().get_session(node_id) else {
        return false;
    };
    let allowed = interval.as_millis() as u64 * 3;
    state.clock.now_ms().saturating_sub(session.last_activity_at) > allowed
}

async fn handle_inbound_frame(
    state: &Arc<GatewayState>,
    node_id: &str,
    text: &str,
    ws_tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
) {
    let Ok(frame) = Frame::decode(text) else {
        warn!(node_id, "dropped malformed frame");
        return;
    };

    match frame {
        Frame::Ack { message_id } => {
            dispatcher::handle_ack(state, node_id, &message_id);
        }
        Frame::Inbound { message_id, channel_id, payload } => {
            dispatcher::handle_inbound_reply(
                state,
                dispatcher::InboundReply {
                    node_id: node_id.to_string(),
                    message_id,
                    channel_id,
                    payload,
                },
            );
        }
        Frame::SessionEvent { event } => {
            let event = match event {
                SessionEventKind::Suspend => edge_gateway_core::SessionEvent::Suspend,
                SessionEventKind::Resume => edge_gateway_core::SessionEvent::Resume,
                SessionEventKind::Disconnect => edge_gateway_core::SessionEvent::Disconnect,
            };
            dispatcher::handle_session_event(state, node_id, event);
        }
        Frame::Ping => {
            if let Ok(encoded) = Frame::Pong.encode() {
                let _ = ws_tx.send(Message::Text(encoded.into())).await;
            }
            dispatcher::handle_activity(state, node_id);
        }
        Frame::Dispatch { .. } | Frame::Pong => {}
    }
}
