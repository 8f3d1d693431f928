use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreatePlanParams, PlansRepo, RepoError},
    domain::entities::EveningPlanRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const MAX_PAGE: u32 = 200;

#[derive(sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: OffsetDateTime,
    expires_at: OffsetDateTime,
}

impl From<PlanRow> for EveningPlanRecord {
    fn from(row: PlanRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            text: row.text,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl PlansRepo for PostgresRepositories {
    async fn list_active_plans(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<EveningPlanRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, author_id, text, created_at, expires_at
            FROM evening_plans
            WHERE expires_at > $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(now)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(EveningPlanRecord::from).collect())
    }

    async fn list_completed_plans(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<EveningPlanRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, author_id, text, created_at, expires_at
            FROM evening_plans
            WHERE expires_at <= $1
            ORDER BY expires_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(i64::from(limit.clamp(1, MAX_PAGE)))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(EveningPlanRecord::from).collect())
    }

    async fn create_plan(&self, params: CreatePlanParams) -> Result<EveningPlanRecord, RepoError> {
        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            INSERT INTO evening_plans (id, author_id, text, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, author_id, text, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.author_id)
        .bind(params.text)
        .bind(params.expires_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
