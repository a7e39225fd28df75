use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One issued code; `destination` is the phone (E.164) or lowercased email
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OtpChallenge {
    pub id: i64,
    pub otp_id: String,
    pub destination: String,
    #[serde(skip_serializing)]
    pub otp: String,
    pub country_code: Option<String>,
    pub purpose: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub provider_used: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OtpChallenge {
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn is_outstanding(&self, now: DateTime<Utc>) -> bool {
        !self.verified && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewOtpChallenge {
    pub otp_id: String,
    pub destination: String,
    pub otp: String,
    pub country_code: Option<String>,
    pub purpose: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub max_attempts: i32,
    pub provider_used: String,
    pub created_at: DateTime<Utc>,
}
