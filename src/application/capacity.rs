//! Live participant counts and capacity-based auto-eviction.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::application::membership::MembershipService;
use crate::application::repos::{RepoError, UsersRepo};
use crate::cache::{CacheKey, CacheStore};
use crate::domain::activities::{ActivityName, ActivityRegistry};

const METRIC_EVICTIONS: &str = "koktail_activity_evictions_total";
const METRIC_ENFORCE_MS: &str = "koktail_capacity_enforce_ms";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCount {
    pub name: ActivityName,
    pub count: u64,
}

/// Per-activity member counts in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityCounts(Vec<ActivityCount>);

impl ActivityCounts {
    pub fn get(&self, name: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|entry| entry.name.as_str() == name)
            .map(|entry| entry.count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityCount> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: ActivityName, count: u64) {
        self.0.push(ActivityCount { name, count });
    }
}

/// Computes counts and evicts members whose personal limit has been reached.
#[derive(Clone)]
pub struct CapacityEnforcer {
    users: Arc<dyn UsersRepo>,
    ledger: MembershipService,
    cache: CacheStore,
}

impl CapacityEnforcer {
    pub fn new(users: Arc<dyn UsersRepo>, ledger: MembershipService, cache: CacheStore) -> Self {
        Self {
            users,
            ledger,
            cache,
        }
    }

    /// Count members of every tracked activity and evict limited members.
    ///
    /// Each activity's count is taken once, before any of its evictions, and
    /// that pre-eviction value is what gets reported. A failed eviction is
    /// logged and skipped. Only the initial population load can fail the call.
    #[instrument(skip_all, fields(activities = registry.len()))]
    pub async fn recompute_and_enforce(
        &self,
        registry: &ActivityRegistry,
    ) -> Result<ActivityCounts, RepoError> {
        let started_at = Instant::now();
        let users = self.users.list_users().await?;

        let mut counts = ActivityCounts::default();
        let mut evicted = 0_u64;

        for activity in registry.iter() {
            let members: Vec<_> = users
                .iter()
                .filter(|user| user.is_member_of(activity.as_str()))
                .collect();
            let count = members.len() as u64;

            for member in members {
                let Some(limit) = member.limit_for(activity.as_str()) else {
                    continue;
                };
                if count < u64::from(limit) {
                    continue;
                }

                match self.ledger.evict(member.id, activity).await {
                    Ok(false) => debug!(
                        user_id = %member.id,
                        activity = %activity,
                        "Member already gone before eviction"
                    ),
                    Ok(true) => {
                        evicted += 1;
                        counter!(METRIC_EVICTIONS).increment(1);
                        info!(
                            user_id = %member.id,
                            activity = %activity,
                            limit,
                            count,
                            "Member evicted: activity reached the recorded limit"
                        );
                    }
                    Err(err) => warn!(
                        user_id = %member.id,
                        activity = %activity,
                        error = %err,
                        "Eviction failed; continuing with remaining members"
                    ),
                }
            }

            counts.push(activity.clone(), count);
        }

        if evicted > 0 {
            self.cache.invalidate(CacheKey::Landing).await;
        }

        histogram!(METRIC_ENFORCE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        Ok(counts)
    }
}
