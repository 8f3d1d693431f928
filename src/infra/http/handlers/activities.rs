//! Membership handlers

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::infra::http::models::{MembershipLimitRequest, MembershipResponse};
use crate::infra::http::state::HttpState;

pub async fn join_activity(
    State(state): State<HttpState>,
    Path((user_id, activity)): Path<(Uuid, String)>,
) -> Result<Json<MembershipResponse>, HttpError> {
    state.membership.join(user_id, &activity).await?;
    Ok(Json(response(user_id, activity, "joined")))
}

pub async fn leave_activity(
    State(state): State<HttpState>,
    Path((user_id, activity)): Path<(Uuid, String)>,
) -> Result<Json<MembershipResponse>, HttpError> {
    state.membership.leave(user_id, &activity).await?;
    Ok(Json(response(user_id, activity, "left")))
}

pub async fn set_activity_limit(
    State(state): State<HttpState>,
    Path((user_id, activity)): Path<(Uuid, String)>,
    Json(body): Json<MembershipLimitRequest>,
) -> Result<Json<MembershipResponse>, HttpError> {
    state
        .membership
        .add_with_limit(user_id, &activity, body.limit)
        .await?;
    Ok(Json(response(user_id, activity, "limited")))
}

fn response(user_id: Uuid, activity: String, action: &'static str) -> MembershipResponse {
    MembershipResponse {
        user_id,
        activity,
        action,
    }
}
