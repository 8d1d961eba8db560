use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::PlayerId;
use crate::reports::{self, PlayerReport};

pub async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlayerReport>, ApiError> {
    let id = PlayerId::from(id);
    reports::player_report(state.store.as_ref(), &state.config, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("player {}", id)))
}

#[derive(Debug, Serialize)]
pub struct DeletePlayerResponse {
    pub id: PlayerId,
    pub name: String,
    pub scores_removed: usize,
}

/// Delete a player together with all of their scores.
pub async fn delete_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletePlayerResponse>, ApiError> {
    let id = PlayerId::from(id);
    let (player, scores_removed) = state
        .store
        .delete_player(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("player {}", id)))?;

    Ok(Json(DeletePlayerResponse {
        id: player.id,
        name: player.name,
        scores_removed,
    }))
}
