//! Evening plans board: short notes that disappear after a fixed lifetime.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::application::content::{ContentError, bounded_text};
use crate::application::repos::{CreatePlanParams, PlansRepo, RepoError, UsersRepo};
use crate::domain::entities::EveningPlanRecord;

const MAX_PLAN_CHARS: usize = 500;

#[derive(Clone)]
pub struct PlansService {
    plans: Arc<dyn PlansRepo>,
    users: Arc<dyn UsersRepo>,
    lifetime: Duration,
}

impl PlansService {
    pub fn new(plans: Arc<dyn PlansRepo>, users: Arc<dyn UsersRepo>, lifetime: Duration) -> Self {
        Self {
            plans,
            users,
            lifetime,
        }
    }

    pub async fn post_plan(
        &self,
        author_id: Uuid,
        text: &str,
    ) -> Result<EveningPlanRecord, ContentError> {
        let text = bounded_text("text", text, MAX_PLAN_CHARS)?;
        if self.users.find_user(author_id).await?.is_none() {
            return Err(ContentError::OwnerNotFound);
        }

        let expires_at = OffsetDateTime::now_utc() + self.lifetime;
        let plan = self
            .plans
            .create_plan(CreatePlanParams {
                author_id,
                text,
                expires_at,
            })
            .await?;
        info!(plan_id = %plan.id, author_id = %author_id, "Evening plan posted");
        Ok(plan)
    }

    /// Plans still within their lifetime. Never cached.
    pub async fn list_active(&self) -> Result<Vec<EveningPlanRecord>, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut plans = self.plans.list_active_plans(now).await?;
        plans.retain(|plan| plan.is_active_at(now));
        Ok(plans)
    }
}
