use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use tessera_core::AppError;

use crate::error::ApiResult;
use crate::state::AppState;

/// Admits only callers presenting the internal shared secret as a bearer
/// token.
pub async fn require_internal_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("internal bearer token required".to_owned()))?;

    if !secrets_match(presented, state.internal_shared_secret.as_str()) {
        return Err(AppError::Unauthorized("invalid internal bearer token".to_owned()).into());
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// Compares without short-circuiting on the first differing byte.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let (presented, expected) = (presented.as_bytes(), expected.as_bytes());
    if presented.len() != expected.len() {
        return false;
    }

    presented
        .iter()
        .zip(expected)
        .fold(0_u8, |difference, (left, right)| difference | (left ^ right))
        == 0
}
