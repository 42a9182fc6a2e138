// SPDX-License-Identifier: BUSL-1.1

//! Control HTTP surface: health, connection inventory, diagnostics, and
//! snapshot/restore.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use edge_gateway_core::GatewayError;

use crate::state::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_connections: usize,
}

/// `GET /api/v1/health` — unauthenticated liveness probe.
pub async fn health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running", active_connections: state.active_connections() })
}

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub node_ids: Vec<String>,
}

/// `GET /api/v1/connections` — currently connected node ids.
pub async fn active_connections(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let node_ids = state.nodes.read().keys().cloned().collect();
    Json(ConnectionsResponse { node_ids })
}

#[derive(Debug, Serialize)]
pub struct EvictResponse {
    pub node_id: String,
    pub evicted: bool,
}

/// `DELETE /api/v1/connections/{node_id}` — force-evict a node, discarding
/// its pending work without re-routing it.
pub async fn evict_connection(
    State(state): State<Arc<GatewayState>>,
    Path(node_id): Path<String>,
) -> impl IntoResponse {
    let evicted = state.node(&node_id).is_some();
    state.evict_node(&node_id);
    Json(EvictResponse { node_id, evicted })
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub conversation_count: usize,
    pub active_connections: usize,
}

/// `GET /api/v1/diagnostics` — cluster-wide counters.
pub async fn diagnostics(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(DiagnosticsResponse {
        conversation_count: state.conversation_count(),
        active_connections: state.active_connections(),
    })
}

#[derive(Debug, Serialize)]
pub struct NodeDiagnosticsResponse {
    pub node_id: String,
    pub pending_count: usize,
    pub circuit_state: Option<String>,
}

/// `GET /api/v1/diagnostics/{node_id}` — per-node delivery and circuit
/// breaker state.
pub async fn node_diagnostics(
    State(state): State<Arc<GatewayState>>,
    Path(node_id): Path<String>,
) -> impl IntoResponse {
    Json(NodeDiagnosticsResponse {
        pending_count: state.pending_count(&node_id),
        circuit_state: state.circuit_state(&node_id).map(|phase| format!("{phase:?}")),
        node_id,
    })
}

/// `GET /api/v1/snapshot` — capture a consistent snapshot of conversation
/// bindings, sessions, and pending deliveries.
pub async fn snapshot(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let now = state.clock.now_ms();
    let bundle = edge_gateway_core::snapshot::capture(
        &state.conversations.lock(),
        &state.sessions.lock(),
        &state.delivery.lock(),
        now,
    );
    Json(bundle)
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub restored: bool,
}

/// `POST /api/v1/snapshot` — restore state from a previously captured
/// snapshot. Rejects (without mutating anything) if any sub-snapshot's
/// schema version is unrecognized.
pub async fn restore(
    State(state): State<Arc<GatewayState>>,
    Json(bundle): Json<edge_gateway_core::GatewaySnapshot>,
) -> impl IntoResponse {
    let result = edge_gateway_core::snapshot::restore(
        &mut state.conversations.lock(),
        &mut state.sessions.lock(),
        &mut state.delivery.lock(),
        bundle,
    );
    match result {
        Ok(()) => Json(RestoreResponse { restored: true }).into_response(),
        Err(err) => error_response(err),
    }
}

/// `GET /api/v1/config` — the live (hot-reloadable) configuration.
pub async fn get_config(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.config.read().clone())
}

fn error_response(err: GatewayError) -> axum::response::Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(serde_json::json!({ "error": err.as_str() }))).into_response()
}
