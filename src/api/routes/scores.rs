use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{Score, ScoreId, SERIES_COUNT};

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub series: [f64; SERIES_COUNT],
}

/// Replace a score's series; the total becomes their sum.
pub async fn update_score(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateScoreRequest>,
) -> Result<Json<Score>, ApiError> {
    if request.series.iter().any(|s| !s.is_finite()) {
        return Err(ApiError::BadRequest("series must be numbers".to_string()));
    }

    let id = ScoreId::from(id);
    state
        .store
        .update_score_series(&id, request.series)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("score {}", id)))
}

pub async fn delete_score(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Score>, ApiError> {
    let id = ScoreId::from(id);
    state
        .store
        .delete_score(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("score {}", id)))
}
