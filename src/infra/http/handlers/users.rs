use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::application::{error::HttpError, users::RegisterUserCommand};
use crate::domain::entities::UserRecord;
use crate::infra::http::models::UserCreateRequest;
use crate::infra::http::state::HttpState;

pub async fn create_user(
    State(state): State<HttpState>,
    Json(body): Json<UserCreateRequest>,
) -> Result<(StatusCode, Json<UserRecord>), HttpError> {
    let user = state
        .users
        .register(RegisterUserCommand {
            name: body.name,
            contact: body.contact,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRecord>, HttpError> {
    state
        .users
        .profile(id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            HttpError::new(
                "infra::http::handlers::get_user",
                StatusCode::NOT_FOUND,
                "User not found",
                format!("User `{id}` does not exist"),
            )
        })
}
