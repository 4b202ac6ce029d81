use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Submission confirmation sent after a batch of submissions is committed.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub to: String,
    pub contest_title: String,
    /// HTML body configured on the contest.
    pub body_html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation(&self, confirmation: Confirmation) -> Result<(), NotifyError>;
}

/// Sends confirmations over SMTP.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Address(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_confirmation(&self, confirmation: Confirmation) -> Result<(), NotifyError> {
        let to = confirmation
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Address(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Submission received: {}", confirmation.contest_title))
            .header(ContentType::TEXT_HTML)
            .body(confirmation.body_html)
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Logs confirmations instead of sending them. Used when mail is disabled.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_confirmation(&self, confirmation: Confirmation) -> Result<(), NotifyError> {
        info!(
            to = %confirmation.to,
            contest = %confirmation.contest_title,
            "Mail disabled, skipping submission confirmation"
        );
        Ok(())
    }
}
