use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::require;
use super::{http_client, SmsError, SmsReceipt, SmsSender};

const ENDPOINT: &str = "https://rest.nexmo.com/sms/json";
const COST_PER_MESSAGE: f64 = 0.005;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VonageConfig {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    messages: Vec<MessageStatus>,
}

#[derive(Debug, Deserialize)]
struct MessageStatus {
    status: String,
    #[serde(rename = "message-id")]
    message_id: Option<String>,
    #[serde(rename = "error-text")]
    error_text: Option<String>,
}

pub struct VonageSender {
    config: VonageConfig,
    client: reqwest::Client,
}

impl VonageSender {
    pub fn new(config: VonageConfig) -> Result<Self, SmsError> {
        require(&config.api_key, "apiKey", "vonage")?;
        require(&config.api_secret, "apiSecret", "vonage")?;

        Ok(Self {
            config,
            client: http_client(),
        })
    }
}

#[async_trait]
impl SmsSender for VonageSender {
    fn name(&self) -> &'static str {
        "vonage"
    }

    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        let to = to.trim_start_matches('+');
        let from = self.config.brand_name.as_deref().unwrap_or("Marketplace");

        let response = self
            .client
            .post(ENDPOINT)
            .form(&[
                ("api_key", self.config.api_key.as_str()),
                ("api_secret", self.config.api_secret.as_str()),
                ("from", from),
                ("to", to),
                ("text", message),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SmsError::provider("vonage", response.status().to_string()));
        }

        let body: SendResponse = response.json().await?;
        let first = body
            .messages
            .into_iter()
            .next()
            .ok_or_else(|| SmsError::provider("vonage", "empty response"))?;

        if first.status != "0" {
            return Err(SmsError::provider(
                "vonage",
                first
                    .error_text
                    .unwrap_or_else(|| format!("status {}", first.status)),
            ));
        }

        Ok(SmsReceipt {
            message_id: first.message_id.unwrap_or_default(),
            cost: COST_PER_MESSAGE,
            provider: "vonage",
        })
    }
}
