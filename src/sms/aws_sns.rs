use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::provider::require;
use super::{http_client, SmsError, SmsReceipt, SmsSender};

const COST_PER_MESSAGE: f64 = 0.0075;
const SERVICE: &str = "sns";
const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsSnsConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Publishes directly to a phone number through the SNS query API, signed with SigV4
pub struct AwsSnsSender {
    config: AwsSnsConfig,
    client: reqwest::Client,
}

/// Headers produced by signing one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub host: String,
    pub amz_date: String,
    pub authorization: String,
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, SmsError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| SmsError::provider("aws", format!("signing key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

impl AwsSnsSender {
    pub fn new(config: AwsSnsConfig) -> Result<Self, SmsError> {
        require(&config.region, "region", "aws")?;
        require(&config.access_key_id, "accessKeyId", "aws")?;
        require(&config.secret_access_key, "secretAccessKey", "aws")?;

        Ok(Self {
            config,
            client: http_client(),
        })
    }

    fn host(&self) -> String {
        format!("sns.{}.amazonaws.com", self.config.region)
    }

    fn publish_body(to: &str, message: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "Publish")
            .append_pair("Message", message)
            .append_pair("PhoneNumber", to)
            .append_pair("Version", "2010-03-31")
            .finish()
    }

    /// AWS Signature Version 4 for a POST to `/` with a form body
    pub fn sign(&self, body: &str, now: DateTime<Utc>) -> Result<SignedHeaders, SmsError> {
        let host = self.host();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let signed_headers = "content-type;host;x-amz-date";

        let canonical_request = format!(
            "POST\n/\n\ncontent-type:{}\nhost:{}\nx-amz-date:{}\n\n{}\n{}",
            CONTENT_TYPE,
            host,
            amz_date,
            signed_headers,
            sha256_hex(body)
        );

        let scope = format!("{}/{}/{}/aws4_request", date, self.config.region, SERVICE);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            sha256_hex(&canonical_request)
        );

        let k_date = hmac_sha256(
            format!("AWS4{}", self.config.secret_access_key).as_bytes(),
            &date,
        )?;
        let k_region = hmac_sha256(&k_date, &self.config.region)?;
        let k_service = hmac_sha256(&k_region, SERVICE)?;
        let k_signing = hmac_sha256(&k_service, "aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, &string_to_sign)?);

        Ok(SignedHeaders {
            host,
            amz_date,
            authorization: format!(
                "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
                self.config.access_key_id, scope, signed_headers, signature
            ),
        })
    }
}

fn extract_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(&xml[start..end])
}

#[async_trait]
impl SmsSender for AwsSnsSender {
    fn name(&self) -> &'static str {
        "aws"
    }

    async fn send_sms(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        let body = Self::publish_body(to, message);
        let signed = self.sign(&body, Utc::now())?;

        let response = self
            .client
            .post(format!("https://{}/", signed.host))
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = extract_tag(&text, "Message").unwrap_or(status.as_str());
            return Err(SmsError::provider("aws", message.to_string()));
        }

        let message_id = extract_tag(&text, "MessageId")
            .map(str::to_string)
            .ok_or_else(|| SmsError::provider("aws", "response did not include a MessageId"))?;

        Ok(SmsReceipt {
            message_id,
            cost: COST_PER_MESSAGE,
            provider: "aws",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sender() -> AwsSnsSender {
        AwsSnsSender::new(AwsSnsConfig {
            region: "us-east-1".into(),
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
        })
        .unwrap()
    }

    #[test]
    fn signature_has_sigv4_shape_and_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let body = AwsSnsSender::publish_body("+94771234567", "Your code is 123456");

        let a = sender().sign(&body, now).unwrap();
        let b = sender().sign(&body, now).unwrap();
        assert_eq!(a, b);

        assert_eq!(a.host, "sns.us-east-1.amazonaws.com");
        assert_eq!(a.amz_date, "20250102T030405Z");
        assert!(a.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20250102/us-east-1/sns/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, Signature="
        ));
        let signature = a.authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));

        let other = sender().sign(&AwsSnsSender::publish_body("+94770000000", "x"), now).unwrap();
        assert_ne!(a.authorization, other.authorization);
    }

    #[test]
    fn publish_body_is_form_encoded() {
        let body = AwsSnsSender::publish_body("+94771234567", "code: 1 2");
        assert!(body.contains("PhoneNumber=%2B94771234567"));
        assert!(body.contains("Message=code%3A+1+2"));
        assert!(body.starts_with("Action=Publish"));
    }

    #[test]
    fn message_id_is_read_from_xml() {
        let xml = "<PublishResponse><PublishResult><MessageId>abc-123</MessageId>\
                   </PublishResult></PublishResponse>";
        assert_eq!(extract_tag(xml, "MessageId"), Some("abc-123"));
        assert_eq!(extract_tag(xml, "Missing"), None);
    }
}
