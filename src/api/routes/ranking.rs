use axum::extract::State;
use axum::Json;
use chrono::Local;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::reports::{self, RankingReport};

pub async fn ranking(State(state): State<AppState>) -> Result<Json<RankingReport>, ApiError> {
    let today = Local::now().date_naive();
    let report = reports::ranking(state.store.as_ref(), &state.config, today).await?;
    Ok(Json(report))
}
