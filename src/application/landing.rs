//! Landing page model: cached heavy content merged with live activity counts.
//!
//! Counts are recomputed on every build because computing them also runs
//! auto-eviction. Comments, gallery items and recently completed evening plans
//! are expensive to assemble and tolerate staleness until the next write
//! invalidates them or the entry expires.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::application::capacity::{ActivityCounts, CapacityEnforcer};
use crate::application::repos::{ContentRepo, PlansRepo, RepoError};
use crate::cache::{CacheKey, CacheStore};
use crate::domain::activities::ActivityRegistry;
use crate::domain::entities::{CommentRecord, EveningPlanRecord, GalleryItemRecord};

#[derive(Debug, Error)]
pub enum LandingError {
    #[error("failed to compute activity counts")]
    Counts(#[source] RepoError),
    #[error("failed to load landing content")]
    Content(#[source] RepoError),
}

/// The cached half of the landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingContent {
    pub comments: Vec<CommentRecord>,
    pub gallery: Vec<GalleryItemRecord>,
    /// Evening plans whose time has passed, most recent first.
    pub completed: Vec<EveningPlanRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub loaded_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingModel {
    pub counts: ActivityCounts,
    #[serde(flatten)]
    pub content: LandingContent,
}

impl LandingModel {
    pub fn merge(content: LandingContent, counts: ActivityCounts) -> Self {
        Self { counts, content }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LandingLimits {
    pub comments: u32,
    pub gallery: u32,
    pub completed: u32,
}

impl Default for LandingLimits {
    fn default() -> Self {
        Self {
            comments: 20,
            gallery: 12,
            completed: 10,
        }
    }
}

#[derive(Clone)]
pub struct LandingService {
    enforcer: CapacityEnforcer,
    content: Arc<dyn ContentRepo>,
    plans: Arc<dyn PlansRepo>,
    registry: Arc<ActivityRegistry>,
    cache: CacheStore,
    limits: LandingLimits,
}

impl LandingService {
    pub fn new(
        enforcer: CapacityEnforcer,
        content: Arc<dyn ContentRepo>,
        plans: Arc<dyn PlansRepo>,
        registry: Arc<ActivityRegistry>,
        cache: CacheStore,
        limits: LandingLimits,
    ) -> Self {
        Self {
            enforcer,
            content,
            plans,
            registry,
            cache,
            limits,
        }
    }

    #[instrument(skip(self))]
    pub async fn build_landing_model(&self) -> Result<LandingModel, LandingError> {
        let counts = self
            .enforcer
            .recompute_and_enforce(&self.registry)
            .await
            .map_err(LandingError::Counts)?;

        let content = match self.cache.get::<LandingContent>(CacheKey::Landing).await {
            Some(cached) => {
                debug!(loaded_at = %cached.loaded_at, "Landing content served from cache");
                cached
            }
            None => {
                let generation = self.cache.generation();
                let fresh = self.load_content().await?;
                self.cache
                    .set_if_current(
                        CacheKey::Landing,
                        &fresh,
                        self.cache.landing_ttl(),
                        generation,
                    )
                    .await;
                fresh
            }
        };

        Ok(LandingModel::merge(content, counts))
    }

    async fn load_content(&self) -> Result<LandingContent, LandingError> {
        let comments = self
            .content
            .list_recent_comments(self.limits.comments)
            .await
            .map_err(LandingError::Content)?;
        let gallery = self
            .content
            .list_recent_gallery_items(self.limits.gallery)
            .await
            .map_err(LandingError::Content)?;
        let now = OffsetDateTime::now_utc();
        let completed = self
            .plans
            .list_completed_plans(now, self.limits.completed)
            .await
            .map_err(LandingError::Content)?;

        Ok(LandingContent {
            comments,
            gallery,
            completed,
            loaded_at: now,
        })
    }
}
