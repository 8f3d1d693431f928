//! Anonymous relay handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::messages::{ReplyCommand, SendMessageCommand};
use crate::domain::entities::RelayMessageRecord;
use crate::infra::http::models::{MessageCreateRequest, MessageReplyRequest};
use crate::infra::http::state::HttpState;

pub async fn send_message(
    State(state): State<HttpState>,
    Path(gallery_item_id): Path<Uuid>,
    Json(body): Json<MessageCreateRequest>,
) -> Result<(StatusCode, Json<RelayMessageRecord>), HttpError> {
    let message = state
        .messages
        .send_to_owner(SendMessageCommand {
            gallery_item_id,
            body: body.body,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_message(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RelayMessageRecord>, HttpError> {
    Ok(Json(state.messages.thread(id).await?))
}

pub async fn reply_to_message(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageReplyRequest>,
) -> Result<Json<RelayMessageRecord>, HttpError> {
    let message = state
        .messages
        .reply(ReplyCommand {
            message_id: id,
            owner_id: body.owner_id,
            body: body.body,
        })
        .await?;
    Ok(Json(message))
}

pub async fn list_inbox(
    State(state): State<HttpState>,
    Path(owner_id): Path<Uuid>,
) -> Result<Json<Vec<RelayMessageRecord>>, HttpError> {
    Ok(Json(state.messages.inbox(owner_id).await?))
}
