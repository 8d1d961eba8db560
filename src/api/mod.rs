//! REST API endpoints.
//!
//! Axum-based HTTP API over the report layer: dashboard, player profiles,
//! rankings, competition history, score edits, CSV import and backup export.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::ingest::ImportError;
use crate::storage::StorageError;

use self::routes::{dashboard, export, goals, health, import, matches, players, ranking, scores};
use self::state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => ApiError::NotFound(what),
            StorageError::Invalid(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::Storage(e) => e.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            error!("{}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any", origin);
            layer.allow_origin(Any)
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/dashboard", get(dashboard::dashboard))
        .route("/api/goals", get(goals::list_goals).post(goals::update_goals))
        .route("/api/import", post(import::import_csv))
        .route(
            "/api/players/:id",
            get(players::get_player).delete(players::delete_player),
        )
        .route(
            "/api/scores/:id",
            put(scores::update_score).delete(scores::delete_score),
        )
        .route("/api/ranking", get(ranking::ranking))
        .route("/api/matches", get(matches::list_matches))
        .route("/api/matches/:name/years", get(matches::match_history))
        .route("/api/matches/:name/:year", get(matches::match_result))
        .route("/api/export", get(export::export))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
