//! Comments and gallery uploads shown on the landing page.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    ContentRepo, CreateCommentParams, CreateGalleryItemParams, RepoError, UsersRepo,
};
use crate::cache::{CacheKey, CacheStore};
use crate::domain::entities::{CommentRecord, GalleryItemRecord};

const MAX_AUTHOR_CHARS: usize = 80;
const MAX_COMMENT_CHARS: usize = 2000;
const MAX_TITLE_CHARS: usize = 200;
const MAX_FILE_NAME_CHARS: usize = 255;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("unsupported file type `{0}`")]
    UnsupportedFileType(String),
    #[error("owner not found")]
    OwnerNotFound,
    #[error("gallery item not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ContentError {
    fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostCommentCommand {
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct UploadGalleryItemCommand {
    pub owner_id: Uuid,
    pub title: String,
    pub file_name: String,
}

/// Writes to landing content. Every successful write invalidates the landing
/// cache entry.
#[derive(Clone)]
pub struct ContentService {
    content: Arc<dyn ContentRepo>,
    users: Arc<dyn UsersRepo>,
    cache: CacheStore,
}

impl ContentService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        users: Arc<dyn UsersRepo>,
        cache: CacheStore,
    ) -> Self {
        Self {
            content,
            users,
            cache,
        }
    }

    pub async fn post_comment(
        &self,
        command: PostCommentCommand,
    ) -> Result<CommentRecord, ContentError> {
        let author = bounded_text("author", &command.author, MAX_AUTHOR_CHARS)?;
        let body = bounded_text("body", &command.body, MAX_COMMENT_CHARS)?;

        let comment = self
            .content
            .create_comment(CreateCommentParams { author, body })
            .await?;
        info!(comment_id = %comment.id, "Comment posted");

        self.cache.invalidate(CacheKey::Landing).await;
        Ok(comment)
    }

    pub async fn upload_gallery_item(
        &self,
        command: UploadGalleryItemCommand,
    ) -> Result<GalleryItemRecord, ContentError> {
        let title = bounded_text("title", &command.title, MAX_TITLE_CHARS)?;
        let file_name = validate_file_name(&command.file_name)?;
        let content_type = gallery_content_type(&file_name)?;

        if self.users.find_user(command.owner_id).await?.is_none() {
            return Err(ContentError::OwnerNotFound);
        }

        let item = self
            .content
            .create_gallery_item(CreateGalleryItemParams {
                owner_id: command.owner_id,
                title,
                file_name,
                content_type,
            })
            .await?;
        info!(
            item_id = %item.id,
            owner_id = %item.owner_id,
            content_type = %item.content_type,
            "Gallery item uploaded"
        );

        self.cache.invalidate(CacheKey::Landing).await;
        Ok(item)
    }

    pub async fn delete_gallery_item(&self, id: Uuid) -> Result<GalleryItemRecord, ContentError> {
        let removed = self
            .content
            .delete_gallery_item(id)
            .await?
            .ok_or(ContentError::NotFound)?;
        info!(item_id = %removed.id, "Gallery item deleted");

        self.cache.invalidate(CacheKey::Landing).await;
        Ok(removed)
    }
}

pub(crate) fn bounded_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ContentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContentError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ContentError::validation(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_file_name(value: &str) -> Result<String, ContentError> {
    let file_name = bounded_text("file_name", value, MAX_FILE_NAME_CHARS)?;
    if file_name.contains(['/', '\\']) || file_name.starts_with('.') {
        return Err(ContentError::validation(
            "file_name",
            "must be a bare file name",
        ));
    }
    Ok(file_name)
}

/// Photos and documents only.
fn gallery_content_type(file_name: &str) -> Result<String, ContentError> {
    let mime = mime_guess::from_path(file_name)
        .first()
        .ok_or_else(|| ContentError::UnsupportedFileType(file_name.to_string()))?;

    let accepted = mime.type_() == mime_guess::mime::IMAGE
        || mime.essence_str() == "application/pdf"
        || mime.essence_str() == "text/plain";
    if !accepted {
        return Err(ContentError::UnsupportedFileType(
            mime.essence_str().to_string(),
        ));
    }
    Ok(mime.essence_str().to_string())
}
