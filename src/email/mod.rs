pub mod brevo;

use thiserror::Error;

use crate::config::EmailConfig;
pub use brevo::BrevoSender;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email delivery is not configured")]
    NotConfigured,

    #[error("Email provider rejected the message: {0}")]
    Provider(String),

    #[error("Email request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outbound email for verification codes
#[derive(Clone)]
pub enum EmailChannel {
    Brevo(BrevoSender),
    /// No provider configured; messages are only logged
    Disabled,
}

impl EmailChannel {
    pub fn from_config(config: &EmailConfig) -> Self {
        match BrevoSender::from_config(config) {
            Some(sender) => EmailChannel::Brevo(sender),
            None => EmailChannel::Disabled,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, EmailChannel::Brevo(_))
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            EmailChannel::Brevo(_) => "brevo",
            EmailChannel::Disabled => "disabled",
        }
    }

    /// Returns the provider message id
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, EmailError> {
        match self {
            EmailChannel::Brevo(sender) => sender.send(to, subject, body).await,
            EmailChannel::Disabled => Err(EmailError::NotConfigured),
        }
    }
}
