use serde::{Deserialize, Serialize};

use super::EmailError;
use crate::config::EmailConfig;

const ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    sender: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    text_content: &'a str,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    message_id: Option<String>,
}

/// Brevo transactional email API client
#[derive(Clone)]
pub struct BrevoSender {
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
    client: reqwest::Client,
}

impl BrevoSender {
    pub fn from_config(config: &EmailConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }

        Some(Self {
            api_key: config.brevo_api_key.clone()?,
            sender_email: config.sender_email.clone()?,
            sender_name: config.sender_name.clone(),
            client: crate::sms::http_client(),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, EmailError> {
        let request = SendRequest {
            sender: Address {
                email: &self.sender_email,
                name: self.sender_name.as_deref(),
            },
            to: vec![Address { email: to, name: None }],
            subject,
            text_content: body,
        };

        let response = self
            .client
            .post(ENDPOINT)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EmailError::Provider(format!("{}: {}", status, text)));
        }

        let body: SendResponse = response.json().await?;
        Ok(body.message_id.unwrap_or_default())
    }
}
