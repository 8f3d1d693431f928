//! Comment and gallery handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::application::content::{PostCommentCommand, UploadGalleryItemCommand};
use crate::application::error::HttpError;
use crate::domain::entities::{CommentRecord, GalleryItemRecord};
use crate::infra::http::models::{CommentCreateRequest, GalleryItemCreateRequest};
use crate::infra::http::state::HttpState;

pub async fn create_comment(
    State(state): State<HttpState>,
    Json(body): Json<CommentCreateRequest>,
) -> Result<(StatusCode, Json<CommentRecord>), HttpError> {
    let comment = state
        .content
        .post_comment(PostCommentCommand {
            author: body.author,
            body: body.body,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn create_gallery_item(
    State(state): State<HttpState>,
    Json(body): Json<GalleryItemCreateRequest>,
) -> Result<(StatusCode, Json<GalleryItemRecord>), HttpError> {
    let item = state
        .content
        .upload_gallery_item(UploadGalleryItemCommand {
            owner_id: body.owner_id,
            title: body.title,
            file_name: body.file_name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn delete_gallery_item(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.content.delete_gallery_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
