use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{http_client, SmsError, SmsReceipt, SmsSender};

const COST_PER_MESSAGE: f64 = 0.003;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
    #[serde(default)]
    pub log_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayResponse {
    message_id: Option<String>,
}

/// In-house HTTP gateway, or log-only delivery for test deployments
pub struct LocalSender {
    config: LocalConfig,
    client: reqwest::Client,
}

impl LocalSender {
    pub fn new(config: LocalConfig) -> Result<Self, SmsError> {
        if !config.log_only {
            let endpoint = config.endpoint.as_deref().unwrap_or("").trim();
            if endpoint.is_empty() {
                return Err(SmsError::InvalidConfig(
                    "local requires 'endpoint' unless 'logOnly' is set".to_string(),
                ));
            }
            url::Url::parse(endpoint)
                .map_err(|e| SmsError::InvalidConfig(format!("local endpoint: {}", e)))?;
        }

        Ok(Self {
            config,
            client: http_client(),
        })
    }

    pub fn log_only() -> Self {
        Self {
            config: LocalConfig {
                log_only: true,
                ..LocalConfig::default()
            },
            client: http_client(),
        }
    }
}

#[async_trait]
impl SmsSender for LocalSender {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        let endpoint = match self.config.endpoint.as_deref() {
            Some(endpoint) if !self.config.log_only => endpoint,
            _ => {
                tracing::info!("Local SMS (log only) to {}: {}", to, message);
                return Ok(SmsReceipt {
                    message_id: format!("local_log_{}", Uuid::new_v4().simple()),
                    cost: COST_PER_MESSAGE,
                    provider: "local",
                });
            }
        };

        let payload = json!({ "to": to, "message": message, "from": "Marketplace" });
        let method = self.config.method.as_deref().map(str::to_ascii_uppercase);
        let mut request = match method.as_deref() {
            Some("PUT") => self.client.put(endpoint),
            _ => self.client.post(endpoint),
        }
        .json(&payload);

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SmsError::provider("local", response.status().to_string()));
        }

        let message_id = response
            .json::<GatewayResponse>()
            .await
            .ok()
            .and_then(|r| r.message_id)
            .unwrap_or_else(|| format!("local_{}", Uuid::new_v4().simple()));

        Ok(SmsReceipt {
            message_id,
            cost: COST_PER_MESSAGE,
            provider: "local",
        })
    }
}
