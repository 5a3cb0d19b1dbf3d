use axum::{
    extract::{Query, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/auth";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Guards the API: waits out a loading provider, and sends anonymous callers
/// to the login route with the requested path in `next`.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let status = state.auth.status(token);
    if status.is_loading {
        return AppError::AuthPending.into_response();
    }
    if !status.is_authenticated {
        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        debug!("Unauthenticated request for {target}; redirecting to login");
        return Redirect::temporary(&login_redirect(&target)).into_response();
    }
    next.run(request).await
}

/// GET /auth
pub async fn login_handler(Query(query): Query<LoginQuery>) -> Json<Value> {
    Json(json!({
        "login_required": true,
        "next": query.next.unwrap_or_else(|| "/".to_string())
    }))
}

fn login_redirect(target: &str) -> String {
    format!("{LOGIN_PATH}?next={}", encode_query_value(target))
}

fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
