pub mod resend;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::EmailConfig;

pub use resend::ResendEmailSender;
pub use templates::EmailTemplate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl EmailMessage {
    pub fn from_template(to: impl Into<String>, template: &EmailTemplate) -> Self {
        let rendered = template.render();
        Self {
            to: to.into(),
            subject: rendered.subject,
            html: rendered.html,
        }
    }
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email provider rejected the request ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Email transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// Outbound email capability
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Returns the provider's message id
    async fn send(&self, message: EmailMessage) -> Result<String, EmailError>;
}

/// Used when no provider key is configured: logs instead of sending
#[derive(Debug, Default, Clone)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<String, EmailError> {
        if !message.to.contains('@') {
            return Err(EmailError::InvalidRecipient(message.to));
        }
        let id = format!("log-{}", uuid::Uuid::new_v4());
        tracing::info!("Email (not sent, no provider configured) to {}: {} [{}]", message.to, message.subject, id);
        Ok(id)
    }
}

/// Pick the Resend client when a key is configured, otherwise log only
pub fn sender_from_config(config: &EmailConfig) -> Arc<dyn EmailSender> {
    match &config.api_key {
        Some(key) => match ResendEmailSender::new(
            key.clone(),
            config.api_base_url.clone(),
            config.from_address.clone(),
            Duration::from_secs(config.timeout_secs),
        ) {
            Ok(sender) => {
                tracing::info!("Email delivery via Resend ({})", config.api_base_url);
                Arc::new(sender)
            }
            Err(e) => {
                tracing::error!("Could not build the Resend client, emails will only be logged: {}", e);
                Arc::new(LogEmailSender)
            }
        },
        None => {
            tracing::warn!("RESEND_API_KEY not set, emails will only be logged");
            Arc::new(LogEmailSender)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sender_accepts_valid_recipient() {
        let message = EmailMessage::from_template(
            "a@example.com",
            &EmailTemplate::Welcome { name: "A".to_string() },
        );
        let id = LogEmailSender.send(message).await.unwrap();
        assert!(id.starts_with("log-"));
    }

    #[tokio::test]
    async fn log_sender_rejects_bad_recipient() {
        let message = EmailMessage {
            to: "nobody".to_string(),
            subject: "s".to_string(),
            html: "h".to_string(),
        };
        assert!(matches!(
            LogEmailSender.send(message).await,
            Err(EmailError::InvalidRecipient(_))
        ));
    }
}
