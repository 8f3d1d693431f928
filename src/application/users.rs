//! Registration and profile lookup.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::content::{ContentError, bounded_text};
use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

const MAX_NAME_CHARS: usize = 80;
const MAX_CONTACT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub name: String,
    pub contact: Option<String>,
}

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UsersRepo>,
}

impl UsersService {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    /// New users start with no memberships.
    pub async fn register(&self, command: RegisterUserCommand) -> Result<UserRecord, ContentError> {
        let name = bounded_text("name", &command.name, MAX_NAME_CHARS)?;
        let contact = match command.contact.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(contact) => Some(bounded_text("contact", contact, MAX_CONTACT_CHARS)?),
        };

        let user = self
            .users
            .create_user(CreateUserParams { name, contact })
            .await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn profile(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        self.users.find_user(id).await
    }
}
