use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SmsProviderConfigRow {
    pub id: i64,
    pub country_code: String,
    pub provider: String,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated `sms_analytics` rows per country and provider
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SmsAnalyticsTotal {
    pub country_code: String,
    pub provider: String,
    pub messages: i64,
    pub failures: i64,
    pub total_cost: f64,
    pub last_sent_at: Option<DateTime<Utc>>,
}
