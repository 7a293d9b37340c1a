use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::Action,
    routes::AppState,
    services::personalization::RecomputeOutcome,
};

#[derive(Debug, Deserialize)]
pub struct RecordInteractionRequest {
    pub user_id: String,
    pub place_id: Uuid,
    pub action: Action,
}

/// Records one interaction and refreshes the user's preferences
///
/// The refresh goes through the same debounce as the recompute endpoint, so
/// a burst of events produces at most one recomputation per interval.
pub async fn record(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RecordInteractionRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RecomputeOutcome>)> {
    let Json(request) = payload?;

    if request.action == Action::Unknown {
        return Err(AppError::InvalidInput(
            "action must be one of view, share, try".to_string(),
        ));
    }

    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("user_id is required".to_string()));
    }

    state
        .store
        .record_interaction(user_id, request.place_id, request.action)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        place_id = %request.place_id,
        action = %request.action,
        "Interaction recorded"
    );

    let outcome = state.personalizer.recompute(user_id, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}
