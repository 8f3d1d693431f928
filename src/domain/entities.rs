//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::activities::MembershipRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub contact: Option<String>,
    pub activities: Vec<MembershipRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    /// Records held by this user for the given activity, in either shape.
    pub fn memberships_for<'a>(
        &'a self,
        activity: &'a str,
    ) -> impl Iterator<Item = &'a MembershipRecord> + 'a {
        self.activities
            .iter()
            .filter(move |record| record.matches(activity))
    }

    pub fn is_member_of(&self, activity: &str) -> bool {
        self.memberships_for(activity).next().is_some()
    }

    /// Smallest limit recorded across this user's records for the activity.
    pub fn limit_for(&self, activity: &str) -> Option<u32> {
        self.memberships_for(activity)
            .filter_map(MembershipRecord::limit)
            .min()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub author: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItemRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub content_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EveningPlanRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl EveningPlanRecord {
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

/// Anonymous note to the owner of a gallery item.
///
/// The sender is never recorded; whoever holds the message id can read the
/// owner's reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayMessageRecord {
    pub id: Uuid,
    pub gallery_item_id: Uuid,
    pub owner_id: Uuid,
    pub body: String,
    pub reply: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub replied_at: Option<OffsetDateTime>,
}

impl RelayMessageRecord {
    pub fn is_answered(&self) -> bool {
        self.reply.is_some()
    }
}
