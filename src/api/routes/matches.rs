use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{MatchHistory, MatchResult};
use crate::reports;

#[derive(Debug, Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<String>,
}

pub async fn list_matches(State(state): State<AppState>) -> Result<Json<MatchListResponse>, ApiError> {
    let matches = reports::match_names(state.store.as_ref(), &state.config).await?;
    Ok(Json(MatchListResponse { matches }))
}

/// Season rosters and team totals for one competition.
pub async fn match_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MatchHistory>, ApiError> {
    reports::match_history(state.store.as_ref(), &state.config, &name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("competition {}", name)))
}

pub async fn match_result(
    State(state): State<AppState>,
    Path((name, year)): Path<(String, i32)>,
) -> Result<Json<MatchResult>, ApiError> {
    let result = reports::match_result(state.store.as_ref(), &state.config, &name, year).await?;
    Ok(Json(result))
}
