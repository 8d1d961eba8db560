use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{Gender, TeamGoal};

#[derive(Debug, Deserialize)]
pub struct ListGoalsParams {
    pub gender: Option<Gender>,
}

pub async fn list_goals(
    State(state): State<AppState>,
    Query(params): Query<ListGoalsParams>,
) -> Result<Json<Vec<TeamGoal>>, ApiError> {
    Ok(Json(state.store.list_team_goals(params.gender).await?))
}

#[derive(Debug, Deserialize)]
pub struct GoalUpdate {
    pub event_name: String,
    pub gender: Gender,
    pub target_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGoalsRequest {
    pub goals: Vec<GoalUpdate>,
}

pub async fn update_goals(
    State(state): State<AppState>,
    Json(request): Json<UpdateGoalsRequest>,
) -> Result<Json<Vec<TeamGoal>>, ApiError> {
    let mut updated = Vec::with_capacity(request.goals.len());
    for goal in request.goals {
        updated.push(
            state
                .store
                .set_team_goal(&goal.event_name, goal.gender, goal.target_score)
                .await?,
        );
    }
    Ok(Json(updated))
}
