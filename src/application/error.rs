use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{
    application::{
        content::ContentError, landing::LandingError, membership::MembershipError,
        messages::MessageError, repos::RepoError,
    },
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Diagnostic chain attached to error responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message }));
        let mut response = (self.status, body).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        const SOURCE: &str = "application::error::repo_error_to_http_error";
        match &error {
            RepoError::NotFound => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Resource not found", &error)
            }
            RepoError::InvalidInput { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &error,
            ),
            RepoError::Timeout => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
                &error,
            ),
            RepoError::Persistence(_) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &error,
            ),
        }
    }
}

impl From<MembershipError> for HttpError {
    fn from(error: MembershipError) -> Self {
        const SOURCE: &str = "application::error::membership_error_to_http_error";
        match error {
            MembershipError::UnknownActivity(name) => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown activity",
                format!("Activity `{name}` is not tracked"),
            ),
            MembershipError::UserNotFound => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "User not found",
                "Membership target user does not exist",
            ),
            MembershipError::InvalidLimit => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Limit must be a positive integer",
                "Rejected non-positive membership limit",
            ),
            MembershipError::Repo(err) => err.into(),
        }
    }
}

impl From<ContentError> for HttpError {
    fn from(error: ContentError) -> Self {
        const SOURCE: &str = "application::error::content_error_to_http_error";
        match error {
            err @ ContentError::Validation { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &err,
            ),
            err @ ContentError::UnsupportedFileType(_) => HttpError::from_error(
                SOURCE,
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Only photos and documents can be uploaded",
                &err,
            ),
            ContentError::OwnerNotFound => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "User not found",
                "Content author does not exist",
            ),
            ContentError::NotFound => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Resource not found",
                "Gallery item does not exist",
            ),
            ContentError::Repo(err) => err.into(),
        }
    }
}

impl From<MessageError> for HttpError {
    fn from(error: MessageError) -> Self {
        const SOURCE: &str = "application::error::message_error_to_http_error";
        match error {
            err @ MessageError::Validation { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &err,
            ),
            err @ (MessageError::GalleryItemNotFound
            | MessageError::OwnerNotFound
            | MessageError::NotFound) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Resource not found", &err)
            }
            err @ MessageError::NotOwner => HttpError::from_error(
                SOURCE,
                StatusCode::FORBIDDEN,
                "Only the owner can reply",
                &err,
            ),
            err @ MessageError::AlreadyAnswered => HttpError::from_error(
                SOURCE,
                StatusCode::CONFLICT,
                "Message already answered",
                &err,
            ),
            MessageError::Repo(err) => err.into(),
        }
    }
}

impl From<LandingError> for HttpError {
    fn from(error: LandingError) -> Self {
        HttpError::from_error(
            "application::error::landing_error_to_http_error",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &error,
        )
    }
}

/// Top-level error for process startup and one-shot commands.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
