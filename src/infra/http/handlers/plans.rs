use axum::{Json, extract::State, http::StatusCode};

use crate::application::error::HttpError;
use crate::domain::entities::EveningPlanRecord;
use crate::infra::http::models::PlanCreateRequest;
use crate::infra::http::state::HttpState;

pub async fn list_plans(
    State(state): State<HttpState>,
) -> Result<Json<Vec<EveningPlanRecord>>, HttpError> {
    let plans = state.plans.list_active().await?;
    Ok(Json(plans))
}

pub async fn create_plan(
    State(state): State<HttpState>,
    Json(body): Json<PlanCreateRequest>,
) -> Result<(StatusCode, Json<EveningPlanRecord>), HttpError> {
    let plan = state.plans.post_plan(body.author_id, &body.text).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}
