//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::activities::{ActivityName, MembershipRecord};
use crate::domain::entities::{
    CommentRecord, EveningPlanRecord, GalleryItemRecord, RelayMessageRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Single-document change applied to a user's `activities` array.
///
/// Every variant is one atomic update of one user, so concurrent writers never
/// observe a half-applied change.
#[derive(Debug, Clone, PartialEq)]
pub enum MembershipMutation {
    /// Remove every record whose name matches, in either shape.
    Pull { name: String },
    /// Append `record` unless a record for `name` already exists.
    PushIfAbsent {
        name: String,
        record: MembershipRecord,
    },
    /// Remove every record for `name`, then append `record`.
    Replace {
        name: String,
        record: MembershipRecord,
    },
}

impl MembershipMutation {
    pub fn pull(name: impl Into<String>) -> Self {
        Self::Pull { name: name.into() }
    }

    /// Plain membership, added only when the user holds none for the activity.
    pub fn join(activity: &ActivityName) -> Self {
        Self::PushIfAbsent {
            name: activity.as_str().to_string(),
            record: MembershipRecord::plain(activity),
        }
    }

    /// Exactly one `{ name, limit }` record afterwards.
    pub fn set_limit(activity: &ActivityName, limit: u32) -> Self {
        Self::Replace {
            name: activity.as_str().to_string(),
            record: MembershipRecord::limited(activity, limit),
        }
    }

    /// Apply the mutation to an in-memory copy of the array. Returns whether
    /// the array changed.
    pub fn apply(&self, activities: &mut Vec<MembershipRecord>) -> bool {
        match self {
            Self::Pull { name } => {
                let before = activities.len();
                activities.retain(|record| !record.matches(name));
                activities.len() != before
            }
            Self::PushIfAbsent { name, record } => {
                if activities.iter().any(|existing| existing.matches(name)) {
                    return false;
                }
                activities.push(record.clone());
                true
            }
            Self::Replace { name, record } => {
                activities.retain(|existing| !existing.matches(name));
                activities.push(record.clone());
                true
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub contact: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CreateGalleryItemParams {
    pub owner_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct CreateMessageParams {
    pub gallery_item_id: Uuid,
    pub owner_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CreatePlanParams {
    pub author_id: Uuid,
    pub text: String,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    /// Every user with their membership array.
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    /// Apply one mutation to one user and report whether the array changed.
    /// Fails with [`RepoError::NotFound`] when the user does not exist.
    async fn update_membership(
        &self,
        user_id: Uuid,
        mutation: MembershipMutation,
    ) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Newest first.
    async fn list_recent_comments(&self, limit: u32) -> Result<Vec<CommentRecord>, RepoError>;

    /// Newest first.
    async fn list_recent_gallery_items(
        &self,
        limit: u32,
    ) -> Result<Vec<GalleryItemRecord>, RepoError>;

    async fn find_gallery_item(&self, id: Uuid) -> Result<Option<GalleryItemRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn create_gallery_item(
        &self,
        params: CreateGalleryItemParams,
    ) -> Result<GalleryItemRecord, RepoError>;

    /// Returns the removed item, or `None` if it did not exist.
    async fn delete_gallery_item(&self, id: Uuid) -> Result<Option<GalleryItemRecord>, RepoError>;
}

#[async_trait]
pub trait PlansRepo: Send + Sync {
    /// Plans that expire after `now`, newest first.
    async fn list_active_plans(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<EveningPlanRecord>, RepoError>;

    /// Plans that expired at or before `now`, most recently expired first.
    async fn list_completed_plans(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<EveningPlanRecord>, RepoError>;

    async fn create_plan(&self, params: CreatePlanParams) -> Result<EveningPlanRecord, RepoError>;
}

/// Anonymous messages from gallery visitors to item owners.
#[async_trait]
pub trait MessagesRepo: Send + Sync {
    async fn create_message(
        &self,
        params: CreateMessageParams,
    ) -> Result<RelayMessageRecord, RepoError>;

    async fn find_message(&self, id: Uuid) -> Result<Option<RelayMessageRecord>, RepoError>;

    /// Newest first.
    async fn list_messages_for_owner(
        &self,
        owner_id: Uuid,
        limit: u32,
    ) -> Result<Vec<RelayMessageRecord>, RepoError>;

    /// Store the owner's reply. Returns `None` unless the message exists,
    /// belongs to `owner_id` and has not been answered yet.
    async fn record_reply(
        &self,
        id: Uuid,
        owner_id: Uuid,
        reply: String,
    ) -> Result<Option<RelayMessageRecord>, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
