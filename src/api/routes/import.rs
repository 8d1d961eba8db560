use axum::extract::State;
use axum::Json;
use chrono::Local;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::ingest::{self, ImportOptions, ImportReport};

/// Import a CSV export sent as the request body.
pub async fn import_csv(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportReport>, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("empty CSV body".to_string()));
    }

    let options = ImportOptions {
        bad_date_policy: state.config.import.bad_date_policy,
        today: Local::now().date_naive(),
    };
    let report = ingest::import_csv(state.store.as_ref(), body.as_bytes(), options).await?;
    Ok(Json(report))
}
