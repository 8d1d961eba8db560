use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::Gender;
use crate::reports::{self, DashboardQuery, DashboardReport};

/// Raw dashboard filters; empty values mean "any".
#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub name: Option<String>,
    pub year: Option<String>,
    pub gender: Option<String>,
    #[serde(rename = "match")]
    pub match_name: Option<String>,
    #[serde(rename = "event")]
    pub event_name: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl TryFrom<DashboardParams> for DashboardQuery {
    type Error = ApiError;

    fn try_from(params: DashboardParams) -> Result<Self, Self::Error> {
        let year = present(&params.year)
            .map(|y| {
                y.parse::<i32>()
                    .map_err(|_| ApiError::BadRequest(format!("invalid year: {}", y)))
            })
            .transpose()?;
        let gender = present(&params.gender)
            .map(|g| g.parse::<Gender>().map_err(ApiError::BadRequest))
            .transpose()?;

        Ok(DashboardQuery {
            name: params.name,
            year,
            gender,
            match_name: params.match_name,
            event_name: params.event_name,
        })
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardReport>, ApiError> {
    let query = DashboardQuery::try_from(params)?;
    let report = reports::dashboard(state.store.as_ref(), &state.config, &query).await?;
    Ok(Json(report))
}
