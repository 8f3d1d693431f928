use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{ContentRepo, CreateCommentParams, CreateGalleryItemParams, RepoError},
    domain::entities::{CommentRecord, GalleryItemRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

const MAX_PAGE: u32 = 200;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    author: String,
    body: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            author: row.author,
            body: row.body,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GalleryItemRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    file_name: String,
    content_type: String,
    created_at: OffsetDateTime,
}

impl From<GalleryItemRow> for GalleryItemRecord {
    fn from(row: GalleryItemRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            file_name: row.file_name,
            content_type: row.content_type,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ContentRepo for PostgresRepositories {
    async fn list_recent_comments(&self, limit: u32) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, author, body, created_at
            FROM comments
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit.clamp(1, MAX_PAGE)))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn list_recent_gallery_items(
        &self,
        limit: u32,
    ) -> Result<Vec<GalleryItemRecord>, RepoError> {
        let rows = sqlx::query_as::<_, GalleryItemRow>(
            r#"
            SELECT id, owner_id, title, file_name, content_type, created_at
            FROM gallery_items
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit.clamp(1, MAX_PAGE)))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(GalleryItemRecord::from).collect())
    }

    async fn find_gallery_item(&self, id: Uuid) -> Result<Option<GalleryItemRecord>, RepoError> {
        let row = sqlx::query_as::<_, GalleryItemRow>(
            r#"
            SELECT id, owner_id, title, file_name, content_type, created_at
            FROM gallery_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(GalleryItemRecord::from))
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, author, body)
            VALUES ($1, $2, $3)
            RETURNING id, author, body, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.author)
        .bind(params.body)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn create_gallery_item(
        &self,
        params: CreateGalleryItemParams,
    ) -> Result<GalleryItemRecord, RepoError> {
        let row = sqlx::query_as::<_, GalleryItemRow>(
            r#"
            INSERT INTO gallery_items (id, owner_id, title, file_name, content_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, title, file_name, content_type, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.owner_id)
        .bind(params.title)
        .bind(params.file_name)
        .bind(params.content_type)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_gallery_item(&self, id: Uuid) -> Result<Option<GalleryItemRecord>, RepoError> {
        let row = sqlx::query_as::<_, GalleryItemRow>(
            r#"
            DELETE FROM gallery_items
            WHERE id = $1
            RETURNING id, owner_id, title, file_name, content_type, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(GalleryItemRecord::from))
    }
}
