use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::require;
use super::{http_client, SmsError, SmsReceipt, SmsSender};

const COST_PER_MESSAGE: f64 = 0.0075;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

pub struct TwilioSender {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioSender {
    pub fn new(config: TwilioConfig) -> Result<Self, SmsError> {
        require(&config.account_sid, "accountSid", "twilio")?;
        require(&config.auth_token, "authToken", "twilio")?;
        require(&config.from_number, "fromNumber", "twilio")?;

        Ok(Self {
            config,
            client: http_client(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            return Err(SmsError::provider("twilio", message));
        }

        let body: MessageResponse = response.json().await?;
        Ok(SmsReceipt {
            message_id: body.sid,
            cost: COST_PER_MESSAGE,
            provider: "twilio",
        })
    }
}
