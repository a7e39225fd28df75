use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::provider::require;
use super::{http_client, SmsError, SmsReceipt, SmsSender};

const DEFAULT_API_URL: &str = "https://webbsms.hutch.lk/";
/// Estimated, in LKR
const COST_PER_MESSAGE: f64 = 0.50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HutchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

/// Sri Lankan Hutch WebbSMS gateway (GET with query parameters)
pub struct HutchSender {
    config: HutchConfig,
    client: reqwest::Client,
}

/// Hutch expects the national number without `+94`, `94` or a trunk `0`
pub fn local_number(to: &str) -> String {
    let cleaned: String = to
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    let cleaned = cleaned
        .strip_prefix("+94")
        .or_else(|| cleaned.strip_prefix("94"))
        .unwrap_or(cleaned.as_str());
    cleaned.strip_prefix('0').unwrap_or(cleaned).to_string()
}

impl HutchSender {
    pub fn new(config: HutchConfig) -> Result<Self, SmsError> {
        require(&config.username, "username", "hutch_mobile")?;
        require(&config.password, "password", "hutch_mobile")?;
        if let Some(api_url) = &config.api_url {
            url::Url::parse(api_url)
                .map_err(|e| SmsError::InvalidConfig(format!("hutch_mobile apiUrl: {}", e)))?;
        }

        Ok(Self {
            config,
            client: http_client(),
        })
    }
}

#[async_trait]
impl SmsSender for HutchSender {
    fn name(&self) -> &'static str {
        "hutch_mobile"
    }

    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        let phone = local_number(to);
        let api_url = self.config.api_url.as_deref().unwrap_or(DEFAULT_API_URL);

        tracing::debug!("Sending SMS via Hutch to {}", phone);

        let response = self
            .client
            .get(api_url)
            .query(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
                ("to", phone.as_str()),
                ("message", message),
                ("sender_id", self.config.sender_id.as_deref().unwrap_or("ALPHABET")),
                ("message_type", self.config.message_type.as_deref().unwrap_or("text")),
            ])
            .send()
            .await?;

        // WebbSMS answers with an HTML page; a 200 means accepted
        if !response.status().is_success() {
            return Err(SmsError::provider("hutch_mobile", response.status().to_string()));
        }

        Ok(SmsReceipt {
            message_id: format!("hutch_{}", Uuid::new_v4().simple()),
            cost: COST_PER_MESSAGE,
            provider: "hutch_mobile",
        })
    }
}
