use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::aws_sns::{AwsSnsConfig, AwsSnsSender};
use super::hutch::{HutchConfig, HutchSender};
use super::local::{LocalConfig, LocalSender};
use super::twilio::{TwilioConfig, TwilioSender};
use super::vonage::{VonageConfig, VonageSender};
use super::{SmsError, SmsReceipt, SmsSender};

/// Stored provider settings, keyed by the `provider` column with the JSON
/// `config` column as payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", content = "config", rename_all = "snake_case")]
pub enum ProviderConfig {
    Twilio(TwilioConfig),
    #[serde(rename = "aws", alias = "aws_sns")]
    AwsSns(AwsSnsConfig),
    Vonage(VonageConfig),
    #[serde(rename = "local", alias = "local_http")]
    Local(LocalConfig),
    HutchMobile(HutchConfig),
}

impl ProviderConfig {
    /// Parse a `(provider, config)` pair as stored in `sms_provider_configs`
    pub fn from_parts(provider: &str, config: Value) -> Result<Self, SmsError> {
        let provider = provider.trim().to_ascii_lowercase();
        serde_json::from_value(json!({ "provider": provider, "config": config })).map_err(|e| {
            SmsError::InvalidConfig(format!("{} configuration: {}", provider, e))
        })
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            ProviderConfig::Twilio(_) => "twilio",
            ProviderConfig::AwsSns(_) => "aws",
            ProviderConfig::Vonage(_) => "vonage",
            ProviderConfig::Local(_) => "local",
            ProviderConfig::HutchMobile(_) => "hutch_mobile",
        }
    }

    /// Build the live sender, validating required settings
    pub fn build(&self) -> Result<SmsProvider, SmsError> {
        Ok(match self {
            ProviderConfig::Twilio(c) => SmsProvider::Twilio(TwilioSender::new(c.clone())?),
            ProviderConfig::AwsSns(c) => SmsProvider::AwsSns(AwsSnsSender::new(c.clone())?),
            ProviderConfig::Vonage(c) => SmsProvider::Vonage(VonageSender::new(c.clone())?),
            ProviderConfig::Local(c) => SmsProvider::Local(LocalSender::new(c.clone())?),
            ProviderConfig::HutchMobile(c) => {
                SmsProvider::HutchMobile(HutchSender::new(c.clone())?)
            }
        })
    }
}

const SECRET_KEYS: &[&str] = &["authToken", "secretAccessKey", "apiSecret", "apiKey", "password"];

/// Copy of a stored `config` object with credentials masked for display
pub fn redact_secrets(config: &Value) -> Value {
    match config {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s)
                            if SECRET_KEYS.contains(&key.as_str()) && !s.is_empty() =>
                        {
                            Value::String("********".to_string())
                        }
                        other => other.clone(),
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

pub(crate) fn require(value: &str, field: &str, provider: &str) -> Result<(), SmsError> {
    if value.trim().is_empty() {
        Err(SmsError::InvalidConfig(format!(
            "{} requires '{}'",
            provider, field
        )))
    } else {
        Ok(())
    }
}

/// A ready-to-use SMS gateway
pub enum SmsProvider {
    Twilio(TwilioSender),
    AwsSns(AwsSnsSender),
    Vonage(VonageSender),
    Local(LocalSender),
    HutchMobile(HutchSender),
}

#[async_trait]
impl SmsSender for SmsProvider {
    fn name(&self) -> &'static str {
        match self {
            SmsProvider::Twilio(s) => s.name(),
            SmsProvider::AwsSns(s) => s.name(),
            SmsProvider::Vonage(s) => s.name(),
            SmsProvider::Local(s) => s.name(),
            SmsProvider::HutchMobile(s) => s.name(),
        }
    }

    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        match self {
            SmsProvider::Twilio(s) => s.send_sms(to, message).await,
            SmsProvider::AwsSns(s) => s.send_sms(to, message).await,
            SmsProvider::Vonage(s) => s.send_sms(to, message).await,
            SmsProvider::Local(s) => s.send_sms(to, message).await,
            SmsProvider::HutchMobile(s) => s.send_sms(to, message).await,
        }
    }
}

impl std::fmt::Debug for SmsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SmsProvider").field(&self.name()).finish()
    }
}
