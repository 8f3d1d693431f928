use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateMessageParams, MessagesRepo, RepoError},
    domain::entities::RelayMessageRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const MAX_PAGE: u32 = 200;

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    gallery_item_id: Uuid,
    owner_id: Uuid,
    body: String,
    reply: Option<String>,
    created_at: OffsetDateTime,
    replied_at: Option<OffsetDateTime>,
}

impl From<MessageRow> for RelayMessageRecord {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            gallery_item_id: row.gallery_item_id,
            owner_id: row.owner_id,
            body: row.body,
            reply: row.reply,
            created_at: row.created_at,
            replied_at: row.replied_at,
        }
    }
}

#[async_trait]
impl MessagesRepo for PostgresRepositories {
    async fn create_message(
        &self,
        params: CreateMessageParams,
    ) -> Result<RelayMessageRecord, RepoError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO relay_messages (id, gallery_item_id, owner_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, gallery_item_id, owner_id, body, reply, created_at, replied_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.gallery_item_id)
        .bind(params.owner_id)
        .bind(params.body)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_message(&self, id: Uuid) -> Result<Option<RelayMessageRecord>, RepoError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, gallery_item_id, owner_id, body, reply, created_at, replied_at
            FROM relay_messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(RelayMessageRecord::from))
    }

    async fn list_messages_for_owner(
        &self,
        owner_id: Uuid,
        limit: u32,
    ) -> Result<Vec<RelayMessageRecord>, RepoError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, gallery_item_id, owner_id, body, reply, created_at, replied_at
            FROM relay_messages
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(owner_id)
        .bind(i64::from(limit.clamp(1, MAX_PAGE)))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RelayMessageRecord::from).collect())
    }

    async fn record_reply(
        &self,
        id: Uuid,
        owner_id: Uuid,
        reply: String,
    ) -> Result<Option<RelayMessageRecord>, RepoError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE relay_messages
            SET reply = $3, replied_at = now()
            WHERE id = $1 AND owner_id = $2 AND reply IS NULL
            RETURNING id, gallery_item_id, owner_id, body, reply, created_at, replied_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(reply)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(RelayMessageRecord::from))
    }
}
