// SPDX-License-Identifier: BUSL-1.1

//! HTTP ingress for channel adapters: adapters are an out-of-process
//! collaborator, so they hand the gateway a `LaneMessage` over this
//! endpoint rather than linking against the dispatcher directly.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use edge_gateway_core::{GatewayError, LaneMessage, ResolveInput};

use crate::config::ConfigScope;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    /// Agent whose routing namespace this message belongs to.
    pub agent_id: String,
    /// Requested conversation scope; falls back to the gateway's
    /// configured default when omitted.
    #[serde(default)]
    pub scope: Option<ConfigScope>,
    /// Pin this message to a specific node instead of letting the
    /// dispatcher pick (or look up) one. Only honored for brand-new
    /// conversation bindings.
    #[serde(default)]
    pub preferred_node: Option<String>,
    pub message: LaneMessage,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub conversation_key: String,
    pub node_id: Option<String>,
}

/// `POST /api/v1/dispatch` — submit a channel-adapter event for routing to
/// an edge worker node.
pub async fn dispatch(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<DispatchRequest>,
) -> impl IntoResponse {
    let scope = req.scope.unwrap_or(state.config.read().default_conversation_scope).into();
    let ctx = req.message.routing_context.clone().unwrap_or_default();

    let resolution = match edge_gateway_core::resolve_conversation_key(ResolveInput {
        scope,
        agent_id: &req.agent_id,
        channel_id: &req.message.channel_id,
        peer_id: ctx.peer_id.as_deref(),
        account_id: ctx.account_id.as_deref(),
        group_id: ctx.group_id.as_deref(),
        message_type: ctx.message_type,
    }) {
        Ok(resolution) => resolution,
        Err(err) => return error_response(err),
    };

    match crate::dispatcher::route_message(
        &state,
        &resolution.key,
        req.preferred_node.as_deref(),
        req.message,
    )
    .await
    {
        Ok(()) => {
            let node_id = state.conversations.lock().get(&resolution.key).map(|b| b.node_id);
            Json(DispatchResponse { conversation_key: resolution.key.as_str().to_string(), node_id })
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: GatewayError) -> axum::response::Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(serde_json::json!({ "error": err.as_str() }))).into_response()
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod tests;
