//! Service layer for business rules.
//!
//! Services sit between the HTTP handlers and the repository traits. They
//! validate input, enforce status transitions, and trigger side effects such as
//! emails and PDF rendering. Every function takes the repository as
//! `&R where R: FullRepository + ?Sized` so it works with both backends and
//! with `Arc<dyn FullRepository>`.

pub mod auth;
pub mod bookings;
pub mod certificates;
pub mod courses;
pub mod documents;
pub mod enrollments;
pub mod inquiries;
pub mod installments;
pub mod payments;

use thiserror::Error;
use tracing::warn;

use crate::db::repository::RepositoryError;
use crate::models::UnknownVariant;
use crate::notify::{MailError, Mailer, OutgoingEmail};
use crate::render::RenderError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<UnknownVariant> for ServiceError {
    fn from(err: UnknownVariant) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Reject blank values for required text fields.
pub(crate) fn require_non_empty(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: `local@domain.tld` without whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !domain.ends_with('.')
}

pub(crate) fn validate_email(email: &str) -> ServiceResult<()> {
    if !is_valid_email(email) {
        return Err(ServiceError::bad_request(format!(
            "'{}' is not a valid email address",
            email.trim()
        )));
    }
    Ok(())
}

/// Send an email, logging instead of failing when delivery does not work.
pub(crate) async fn deliver(mailer: &dyn Mailer, email: OutgoingEmail, kind: &str) {
    let to = email.to.clone();
    if let Err(e) = mailer.send(email).await {
        warn!(to = %to, kind, error = %e, "Email delivery failed");
    }
}
