use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::StoredPreference,
    routes::AppState,
    services::personalization::RecomputeOutcome,
};

#[derive(Debug, Deserialize)]
pub struct RecomputeRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Handler for the preference recompute endpoint
pub async fn recompute(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RecomputeRequest>, JsonRejection>,
) -> AppResult<Json<RecomputeOutcome>> {
    let Json(request) = payload?;

    let user_id = request
        .user_id
        .ok_or_else(|| AppError::InvalidInput("user_id is required".to_string()))?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        "Processing preference recompute"
    );

    let outcome = state.personalizer.recompute(&user_id, Utc::now()).await?;

    tracing::info!(
        request_id = %request_id,
        outcome = ?outcome,
        "Preference recompute finished"
    );

    Ok(Json(outcome))
}

/// Handler returning a user's stored preference vector
pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<StoredPreference>> {
    let stored = state.personalizer.preference(&user_id).await?;
    Ok(Json(stored))
}
