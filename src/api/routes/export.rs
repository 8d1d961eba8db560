use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::storage::Snapshot;

/// Every record as one JSON document, for backups.
pub async fn export(State(state): State<AppState>) -> Result<Json<Snapshot>, ApiError> {
    let snapshot = state.store.snapshot().await?;
    info!(
        "Exporting {} players, {} scores, {} team goals",
        snapshot.players.len(),
        snapshot.scores.len(),
        snapshot.team_goals.len()
    );
    Ok(Json(snapshot))
}
