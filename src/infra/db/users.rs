use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::{
    application::repos::{CreateUserParams, MembershipMutation, RepoError, UsersRepo},
    domain::{activities::MembershipRecord, entities::UserRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

// `$2` is the activity name in all three statements. An element matches when
// it is the bare string or an object whose `name` equals it.

/// Drops every matching element, keeping the order of what remains. Touches
/// the row only when something matches.
const PULL_MEMBERSHIP_SQL: &str = r#"
    UPDATE users
    SET activities = COALESCE(
        (
            SELECT jsonb_agg(elem ORDER BY position)
            FROM jsonb_array_elements(users.activities) WITH ORDINALITY AS t(elem, position)
            WHERE NOT (
                elem = to_jsonb($2::text)
                OR (jsonb_typeof(elem) = 'object' AND COALESCE(elem ->> 'name', '') = $2)
            )
        ),
        '[]'::jsonb
    )
    WHERE id = $1
      AND EXISTS (
          SELECT 1
          FROM jsonb_array_elements(users.activities) AS t(elem)
          WHERE elem = to_jsonb($2::text)
             OR (jsonb_typeof(elem) = 'object' AND COALESCE(elem ->> 'name', '') = $2)
      )
"#;

/// Appends `$3` unless a matching element already exists.
const PUSH_IF_ABSENT_SQL: &str = r#"
    UPDATE users
    SET activities = activities || jsonb_build_array($3::jsonb)
    WHERE id = $1
      AND NOT EXISTS (
          SELECT 1
          FROM jsonb_array_elements(users.activities) AS t(elem)
          WHERE elem = to_jsonb($2::text)
             OR (jsonb_typeof(elem) = 'object' AND COALESCE(elem ->> 'name', '') = $2)
      )
"#;

/// Drops every matching element and appends `$3` in the same statement.
const REPLACE_MEMBERSHIP_SQL: &str = r#"
    UPDATE users
    SET activities = COALESCE(
        (
            SELECT jsonb_agg(elem ORDER BY position)
            FROM jsonb_array_elements(users.activities) WITH ORDINALITY AS t(elem, position)
            WHERE NOT (
                elem = to_jsonb($2::text)
                OR (jsonb_typeof(elem) = 'object' AND COALESCE(elem ->> 'name', '') = $2)
            )
        ),
        '[]'::jsonb
    ) || jsonb_build_array($3::jsonb)
    WHERE id = $1
"#;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    contact: Option<String>,
    activities: JsonValue,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        let activities = decode_memberships(row.id, row.activities);
        Self {
            id: row.id,
            name: row.name,
            contact: row.contact,
            activities,
            created_at: row.created_at,
        }
    }
}

/// Each element decodes independently; unknown shapes survive as
/// [`MembershipRecord::Malformed`].
fn decode_memberships(user_id: Uuid, value: JsonValue) -> Vec<MembershipRecord> {
    match value {
        JsonValue::Array(items) => items
            .into_iter()
            .map(MembershipRecord::from_value)
            .collect(),
        other => {
            warn!(
                user_id = %user_id,
                value = %other,
                "User activities is not an array; treating as empty"
            );
            Vec::new()
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, contact, activities, created_at FROM users ORDER BY created_at, id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, contact, activities, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, contact)
            VALUES ($1, $2, $3)
            RETURNING id, name, contact, activities, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.name)
        .bind(params.contact)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_membership(
        &self,
        user_id: Uuid,
        mutation: MembershipMutation,
    ) -> Result<bool, RepoError> {
        let result = match mutation {
            MembershipMutation::Pull { name } => {
                sqlx::query(PULL_MEMBERSHIP_SQL)
                    .bind(user_id)
                    .bind(name)
                    .execute(self.pool())
                    .await
            }
            MembershipMutation::PushIfAbsent { name, record } => {
                sqlx::query(PUSH_IF_ABSENT_SQL)
                    .bind(user_id)
                    .bind(name)
                    .bind(Json(record))
                    .execute(self.pool())
                    .await
            }
            MembershipMutation::Replace { name, record } => {
                sqlx::query(REPLACE_MEMBERSHIP_SQL)
                    .bind(user_id)
                    .bind(name)
                    .bind(Json(record))
                    .execute(self.pool())
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        if self.user_exists(user_id).await? {
            Ok(false)
        } else {
            Err(RepoError::NotFound)
        }
    }
}

impl PostgresRepositories {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_keeps_both_shapes_and_malformed_entries() {
        let decoded = decode_memberships(
            Uuid::nil(),
            json!(["Chess", { "name": "Dance", "limit": 4 }, 17, { "title": "x" }]),
        );

        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], MembershipRecord::Name("Chess".into()));
        assert_eq!(decoded[1].limit(), Some(4));
        assert!(matches!(decoded[2], MembershipRecord::Malformed(_)));
        assert!(matches!(decoded[3], MembershipRecord::Malformed(_)));
    }

    #[test]
    fn decode_non_array_is_empty() {
        assert!(decode_memberships(Uuid::nil(), json!({ "Chess": true })).is_empty());
        assert!(decode_memberships(Uuid::nil(), JsonValue::Null).is_empty());
    }
}
