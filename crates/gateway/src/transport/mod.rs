// SPDX-License-Identifier: BUSL-1.1

//! HTTP + WebSocket transport for the gateway.

pub mod auth;
pub mod frame;
pub mod ws;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::control;
use crate::ingress;
use crate::state::GatewayState;

/// Build the axum `Router` with all gateway routes.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(control::health))
        // Node WebSocket upgrade
        .route("/ws/{node_id}", get(ws::ws_handler))
        // Channel adapter ingress
        .route("/api/v1/dispatch", post(ingress::dispatch))
        // Control surface
        .route("/api/v1/connections", get(control::active_connections))
        .route("/api/v1/connections/{node_id}", axum::routing::delete(control::evict_connection))
        .route("/api/v1/diagnostics", get(control::diagnostics))
        .route("/api/v1/diagnostics/{node_id}", get(control::node_diagnostics))
        .route("/api/v1/snapshot", get(control::snapshot).post(control::restore))
        .route("/api/v1/config", get(control::get_config))
        // Middleware
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
