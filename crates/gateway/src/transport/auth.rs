// SPDX-License-Identifier: BUSL-1.1

//! Bearer token authentication for the HTTP control surface and the
//! WebSocket upgrade path.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use edge_gateway_core::GatewayError;

use crate::state::GatewayState;

/// Constant-time string comparison to avoid leaking token length/prefix
/// information via timing.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate a Bearer token from HTTP headers. `None` expected disables auth.
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), GatewayError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::Unavailable)?;

    let token = header.strip_prefix("Bearer ").ok_or(GatewayError::Unavailable)?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(GatewayError::Unavailable)
    }
}

/// Validate a token carried in a WebSocket upgrade query string
/// (`?token=...`).
pub fn validate_ws_query(query: &str, expected: Option<&str>) -> Result<(), GatewayError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("token=") {
            if constant_time_eq(value, expected) {
                return Ok(());
            }
        }
    }
    Err(GatewayError::Unavailable)
}

/// Axum middleware enforcing Bearer auth on the HTTP control surface.
/// Exempt: health checks and the WebSocket upgrade path, which is
/// authenticated via query param inside its own handler.
pub async fn auth_layer(
    State(state): State<Arc<GatewayState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if path == "/api/v1/health" || path.starts_with("/ws/") {
        return next.run(req).await;
    }

    let auth_token = state.config.read().nexus_api_key.clone();
    if let Err(err) = validate_bearer(req.headers(), auth_token.as_deref()) {
        let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::UNAUTHORIZED);
        return (status, axum::Json(serde_json::json!({ "error": err.as_str() }))).into_response();
    }

    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
