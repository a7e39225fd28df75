use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverVerification {
    pub id: i64,
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub nic_number: String,
    pub phone_number: String,
    pub secondary_mobile: Option<String>,
    pub email: Option<String>,
    pub city_id: Option<String>,
    pub city_name: Option<String>,
    pub country: String,

    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub license_has_no_expiry: bool,

    pub vehicle_type_id: Option<String>,
    pub vehicle_type_name: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
    pub vehicle_number: Option<String>,
    pub vehicle_color: Option<String>,
    pub is_vehicle_owner: bool,
    pub insurance_number: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub vehicle_image_urls: Option<serde_json::Value>,
    pub subscription_plan: String,

    pub driver_image_url: Option<String>,
    pub driver_image_status: Option<String>,
    pub driver_image_rejection_reason: Option<String>,
    pub nic_front_url: Option<String>,
    pub nic_front_status: Option<String>,
    pub nic_front_rejection_reason: Option<String>,
    pub nic_back_url: Option<String>,
    pub nic_back_status: Option<String>,
    pub nic_back_rejection_reason: Option<String>,
    pub license_front_url: Option<String>,
    pub license_front_status: Option<String>,
    pub license_front_rejection_reason: Option<String>,
    pub license_back_url: Option<String>,
    pub license_back_status: Option<String>,
    pub license_back_rejection_reason: Option<String>,
    pub vehicle_registration_url: Option<String>,
    pub vehicle_registration_status: Option<String>,
    pub vehicle_registration_rejection_reason: Option<String>,
    pub vehicle_insurance_url: Option<String>,
    pub vehicle_insurance_status: Option<String>,
    pub vehicle_insurance_rejection_reason: Option<String>,
    pub billing_proof_url: Option<String>,
    pub billing_proof_status: Option<String>,
    pub billing_proof_rejection_reason: Option<String>,

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
pub struct DriverProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub nic_number: String,
    pub phone_number: String,
    pub secondary_mobile: Option<String>,
    pub email: Option<String>,
    pub city_id: Option<String>,
    pub city_name: Option<String>,
    pub country: String,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub license_has_no_expiry: bool,
    pub vehicle_type_id: Option<String>,
    pub vehicle_type_name: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
    pub vehicle_number: Option<String>,
    pub vehicle_color: Option<String>,
    pub is_vehicle_owner: bool,
    pub insurance_number: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub vehicle_image_urls: Option<serde_json::Value>,
    pub subscription_plan: String,
}
