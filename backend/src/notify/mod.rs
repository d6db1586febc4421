//! Transactional email.
//!
//! Services build an [`OutgoingEmail`] with one of the [`templates`] and hand
//! it to a [`Mailer`]. Two transports exist:
//!
//! - [`SmtpMailer`]: delivers through an SMTP relay using lettre
//! - [`LogMailer`]: logs each message and keeps it in an in-memory outbox

pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{MailSettings, MailTransport};

pub use smtp::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

/// File attached to an email.
#[derive(Debug, Clone, Serialize)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub attachments: Vec<EmailAttachment>,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            to_name: None,
            subject: subject.into(),
            html_body: String::new(),
            text_body: String::new(),
            attachments: Vec::new(),
        }
    }

    pub fn to_name(mut self, name: impl Into<String>) -> Self {
        self.to_name = Some(name.into());
        self
    }

    pub fn bodies(mut self, text: impl Into<String>, html: impl Into<String>) -> Self {
        self.text_body = text.into();
        self.html_body = html.into();
        self
    }

    pub fn attach(
        mut self,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.attachments.push(EmailAttachment {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        });
        self
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: OutgoingEmail) -> Result<(), MailError>;
}

/// Build the mailer selected by `[mail] transport`.
pub fn mailer_from_settings(settings: &MailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    match settings.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer::new())),
        MailTransport::Smtp => Ok(Arc::new(SmtpMailer::new(settings)?)),
    }
}

/// A message accepted by [`LogMailer`].
#[derive(Debug, Clone, Serialize)]
pub struct SentEmail {
    pub sent_at: DateTime<Utc>,
    pub message: OutgoingEmail,
}

/// Messages a default [`LogMailer`] keeps before dropping the oldest.
pub const LOG_OUTBOX_CAPACITY: usize = 100;

/// Mailer that only logs and records messages.
///
/// The outbox holds at most `capacity` messages; older ones are dropped.
#[derive(Clone)]
pub struct LogMailer {
    outbox: Arc<RwLock<VecDeque<SentEmail>>>,
    capacity: usize,
    failing: Arc<RwLock<bool>>,
}

impl Default for LogMailer {
    fn default() -> Self {
        Self::with_capacity(LOG_OUTBOX_CAPACITY)
    }
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            outbox: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            failing: Arc::new(RwLock::new(false)),
        }
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.outbox
            .read()
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Messages addressed to `email`.
    pub fn sent_to(&self, email: &str) -> Vec<OutgoingEmail> {
        self.outbox
            .read()
            .iter()
            .filter(|entry| entry.message.to.eq_ignore_ascii_case(email))
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.outbox.write().clear();
    }

    /// Make every subsequent `send` fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: OutgoingEmail) -> Result<(), MailError> {
        if *self.failing.read() {
            return Err(MailError::Transport("log mailer set to fail".to_string()));
        }
        info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "Email queued (log transport)"
        );
        let mut outbox = self.outbox.write();
        while outbox.len() >= self.capacity {
            outbox.pop_front();
        }
        outbox.push_back(SentEmail {
            sent_at: Utc::now(),
            message,
        });
        Ok(())
    }
}
