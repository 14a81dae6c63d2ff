use axum::Json;
use axum::extract::State;
use tessera_application::AuthorizeRequest;

use crate::dto::{AuthorizeRequestBody, DecisionResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Answers one authorization question, failing closed when a store is
/// unavailable.
pub async fn authorize_handler(
    State(state): State<AppState>,
    Json(payload): Json<AuthorizeRequestBody>,
) -> ApiResult<Json<DecisionResponse>> {
    let request = AuthorizeRequest::try_from(payload)?;
    let decision = state.permission_resolver.decide(&request).await?;

    Ok(Json(DecisionResponse::from(decision)))
}
