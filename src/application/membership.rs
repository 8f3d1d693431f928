//! Membership ledger: users joining and leaving activities.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{MembershipMutation, RepoError, UsersRepo};
use crate::cache::{CacheKey, CacheStore};
use crate::domain::activities::{ActivityName, ActivityRegistry};

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("unknown activity `{0}`")]
    UnknownActivity(String),
    #[error("user not found")]
    UserNotFound,
    #[error("limit must be a positive integer")]
    InvalidLimit,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct MembershipService {
    users: Arc<dyn UsersRepo>,
    registry: Arc<ActivityRegistry>,
    cache: CacheStore,
}

impl MembershipService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        registry: Arc<ActivityRegistry>,
        cache: CacheStore,
    ) -> Self {
        Self {
            users,
            registry,
            cache,
        }
    }

    pub fn registry(&self) -> &ActivityRegistry {
        &self.registry
    }

    /// Ensure the user holds a membership for the activity.
    ///
    /// The existence check and the append are one conditional update, so an
    /// existing record of either shape (and its limit) is left untouched even
    /// under concurrent joins.
    pub async fn join(&self, user_id: Uuid, activity: &str) -> Result<(), MembershipError> {
        let activity = self.resolve(activity)?;

        let joined = self
            .mutate(user_id, MembershipMutation::join(&activity))
            .await?;
        if !joined {
            debug!(user_id = %user_id, activity = %activity, "Join skipped: already a member");
            return Ok(());
        }
        info!(user_id = %user_id, activity = %activity, "Activity joined");

        self.cache.invalidate(CacheKey::Landing).await;
        Ok(())
    }

    /// Drop every record the user holds for the activity. Absent is fine.
    pub async fn leave(&self, user_id: Uuid, activity: &str) -> Result<(), MembershipError> {
        let activity = self.resolve(activity)?;

        let left = self.pull(user_id, &activity).await?;
        if !left {
            debug!(user_id = %user_id, activity = %activity, "Leave skipped: not a member");
            return Ok(());
        }
        info!(user_id = %user_id, activity = %activity, "Activity left");

        self.cache.invalidate(CacheKey::Landing).await;
        Ok(())
    }

    /// Replace the user's records for the activity with one `{ name, limit }`.
    pub async fn add_with_limit(
        &self,
        user_id: Uuid,
        activity: &str,
        limit: u32,
    ) -> Result<(), MembershipError> {
        if limit == 0 {
            return Err(MembershipError::InvalidLimit);
        }
        let activity = self.resolve(activity)?;

        self.mutate(user_id, MembershipMutation::set_limit(&activity, limit))
            .await?;
        info!(user_id = %user_id, activity = %activity, limit, "Activity joined with limit");

        self.cache.invalidate(CacheKey::Landing).await;
        Ok(())
    }

    /// Removal on behalf of the system; same semantics as [`Self::leave`].
    pub async fn remove(&self, user_id: Uuid, activity: &str) -> Result<(), MembershipError> {
        let activity = self.resolve(activity)?;

        if self.evict(user_id, &activity).await? {
            self.cache.invalidate(CacheKey::Landing).await;
        }
        Ok(())
    }

    /// Pull the membership without touching the cache. Callers that remove
    /// in bulk invalidate once themselves.
    pub(crate) async fn evict(
        &self,
        user_id: Uuid,
        activity: &ActivityName,
    ) -> Result<bool, MembershipError> {
        let removed = self.pull(user_id, activity).await?;
        if removed {
            info!(user_id = %user_id, activity = %activity, "Membership removed");
        }
        Ok(removed)
    }

    fn resolve(&self, raw: &str) -> Result<ActivityName, MembershipError> {
        self.registry
            .resolve(raw)
            .cloned()
            .ok_or_else(|| MembershipError::UnknownActivity(raw.trim().to_string()))
    }

    async fn pull(&self, user_id: Uuid, activity: &ActivityName) -> Result<bool, MembershipError> {
        self.mutate(user_id, MembershipMutation::pull(activity.as_str()))
            .await
    }

    async fn mutate(
        &self,
        user_id: Uuid,
        mutation: MembershipMutation,
    ) -> Result<bool, MembershipError> {
        match self.users.update_membership(user_id, mutation).await {
            Ok(changed) => Ok(changed),
            Err(RepoError::NotFound) => Err(MembershipError::UserNotFound),
            Err(err) => Err(MembershipError::Repo(err)),
        }
    }
}
