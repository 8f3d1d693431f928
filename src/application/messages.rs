//! Anonymous relay between gallery visitors and the owners of gallery items.
//!
//! A visitor writes to the owner of an item without identifying themselves.
//! The message id handed back is the only handle on the conversation: the
//! visitor uses it to read the owner's reply.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::content::{ContentError, bounded_text};
use crate::application::repos::{
    ContentRepo, CreateMessageParams, MessagesRepo, RepoError, UsersRepo,
};
use crate::domain::entities::RelayMessageRecord;

const MAX_MESSAGE_CHARS: usize = 1000;
const INBOX_LIMIT: u32 = 50;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("gallery item not found")]
    GalleryItemNotFound,
    #[error("owner not found")]
    OwnerNotFound,
    #[error("message not found")]
    NotFound,
    #[error("message belongs to another owner")]
    NotOwner,
    #[error("message already answered")]
    AlreadyAnswered,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub gallery_item_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ReplyCommand {
    pub message_id: Uuid,
    pub owner_id: Uuid,
    pub body: String,
}

#[derive(Clone)]
pub struct MessagesService {
    messages: Arc<dyn MessagesRepo>,
    content: Arc<dyn ContentRepo>,
    users: Arc<dyn UsersRepo>,
}

impl MessagesService {
    pub fn new(
        messages: Arc<dyn MessagesRepo>,
        content: Arc<dyn ContentRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            messages,
            content,
            users,
        }
    }

    /// Relay a visitor's note to whoever owns the gallery item.
    pub async fn send_to_owner(
        &self,
        command: SendMessageCommand,
    ) -> Result<RelayMessageRecord, MessageError> {
        let body = message_text("body", &command.body)?;
        let item = self
            .content
            .find_gallery_item(command.gallery_item_id)
            .await?
            .ok_or(MessageError::GalleryItemNotFound)?;

        let message = self
            .messages
            .create_message(CreateMessageParams {
                gallery_item_id: item.id,
                owner_id: item.owner_id,
                body,
            })
            .await?;
        info!(
            message_id = %message.id,
            gallery_item_id = %item.id,
            owner_id = %item.owner_id,
            "Message relayed to owner"
        );
        Ok(message)
    }

    pub async fn inbox(&self, owner_id: Uuid) -> Result<Vec<RelayMessageRecord>, MessageError> {
        if self.users.find_user(owner_id).await?.is_none() {
            return Err(MessageError::OwnerNotFound);
        }
        Ok(self
            .messages
            .list_messages_for_owner(owner_id, INBOX_LIMIT)
            .await?)
    }

    /// The message and, once given, the owner's reply.
    pub async fn thread(&self, message_id: Uuid) -> Result<RelayMessageRecord, MessageError> {
        self.messages
            .find_message(message_id)
            .await?
            .ok_or(MessageError::NotFound)
    }

    /// Answer a message once. Only the item's owner may reply.
    pub async fn reply(&self, command: ReplyCommand) -> Result<RelayMessageRecord, MessageError> {
        let body = message_text("reply", &command.body)?;

        if let Some(answered) = self
            .messages
            .record_reply(command.message_id, command.owner_id, body)
            .await?
        {
            info!(message_id = %answered.id, owner_id = %answered.owner_id, "Message answered");
            return Ok(answered);
        }

        let existing = self
            .messages
            .find_message(command.message_id)
            .await?
            .ok_or(MessageError::NotFound)?;
        if existing.owner_id != command.owner_id {
            return Err(MessageError::NotOwner);
        }
        Err(MessageError::AlreadyAnswered)
    }
}

fn message_text(field: &'static str, value: &str) -> Result<String, MessageError> {
    bounded_text(field, value, MAX_MESSAGE_CHARS).map_err(|err| match err {
        ContentError::Validation { field, reason } => MessageError::Validation { field, reason },
        other => MessageError::Validation {
            field,
            reason: other.to_string(),
        },
    })
}
