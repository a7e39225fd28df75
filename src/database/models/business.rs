use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessVerification {
    pub id: i64,
    pub user_id: Uuid,
    pub business_name: String,
    pub business_email: String,
    pub business_phone: String,
    pub business_address: Option<String>,
    pub business_category: Option<String>,
    pub business_description: Option<String>,
    pub license_number: Option<String>,
    pub tax_id: Option<String>,
    pub country: String,
    pub country_name: Option<String>,

    pub business_logo_url: Option<String>,
    pub business_logo_status: Option<String>,
    pub business_logo_rejection_reason: Option<String>,
    pub business_license_url: Option<String>,
    pub business_license_status: Option<String>,
    pub business_license_rejection_reason: Option<String>,
    pub insurance_document_url: Option<String>,
    pub insurance_document_status: Option<String>,
    pub insurance_document_rejection_reason: Option<String>,
    pub tax_certificate_url: Option<String>,
    pub tax_certificate_status: Option<String>,
    pub tax_certificate_rejection_reason: Option<String>,

    pub status: String,
    pub notes: Option<String>,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub is_verified: bool,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_date: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Applicant-editable fields, validated and with the country resolved
#[derive(Debug, Clone)]
pub struct BusinessProfile {
    pub business_name: String,
    pub business_email: String,
    pub business_phone: String,
    pub business_address: Option<String>,
    pub business_category: Option<String>,
    pub business_description: Option<String>,
    pub license_number: Option<String>,
    pub tax_id: Option<String>,
    pub country: String,
    pub country_name: Option<String>,
}
