//! Outbound SMS delivery.
//!
//! Each supported gateway is a variant of [`SmsProvider`], built once from a
//! stored [`ProviderConfig`] and held per country in the [`SmsRegistry`].

pub mod aws_sns;
pub mod hutch;
pub mod local;
pub mod provider;
pub mod registry;
pub mod twilio;
pub mod vonage;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use provider::{ProviderConfig, SmsProvider};
pub use registry::{ProviderSlot, SmsRegistry};

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("No active SMS provider configured for country {0}")]
    NotConfigured(String),

    #[error("SMS provider for country {country} is misconfigured: {reason}")]
    Misconfigured { country: String, reason: String },

    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),

    #[error("{provider} rejected the message: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("SMS gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SmsError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        SmsError::Provider {
            provider,
            message: message.into(),
        }
    }
}

/// Delivery acknowledgement from a gateway
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsReceipt {
    pub message_id: String,
    /// Estimated cost in the gateway's billing currency
    pub cost: f64,
    pub provider: &'static str,
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError>;
}

/// Gateway timeout shared by every provider client
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(concat!("marketplace-admin-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}
