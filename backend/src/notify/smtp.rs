//! SMTP delivery through lettre's async transport.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::MailSettings;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a STARTTLS transport for `settings.smtp_host`.
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(settings.smtp_port);

        if !settings.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.smtp_username.clone(),
                settings.smtp_password.clone(),
            ));
        }

        let from = mailbox(Some(&settings.from_name), &settings.from_address)?;
        info!(host = %settings.smtp_host, port = settings.smtp_port, "SMTP mailer configured");

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, message: OutgoingEmail) -> Result<Message, MailError> {
        let to = mailbox(message.to_name.as_deref(), &message.to)?;
        let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
            message.text_body,
            message.html_body,
        ));

        for attachment in message.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| MailError::Build(e.to_string()))?;
            body = body.singlepart(
                Attachment::new(attachment.filename).body(attachment.bytes, content_type),
            );
        }

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .multipart(body)
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

fn mailbox(name: Option<&str>, address: &str) -> Result<Mailbox, MailError> {
    let parsed: Address = address.parse().map_err(|e: lettre::address::AddressError| {
        MailError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(Mailbox::new(name.map(str::to_string), parsed))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: OutgoingEmail) -> Result<(), MailError> {
        let to = message.to.clone();
        let email = self.build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        debug!(to = %to, "Email delivered via SMTP");
        Ok(())
    }
}
