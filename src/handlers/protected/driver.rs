use axum::{extract::State, Extension, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::database::models::{DriverProfile, DriverVerification};
use crate::error::ApiError;
use crate::handlers::{present, LooseInt, RequiredFields};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::verification::{Submission, Submitted};
use crate::services::DocumentType;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSubmissionRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub nic_number: Option<String>,
    pub phone_number: Option<String>,
    pub secondary_mobile: Option<String>,
    pub email: Option<String>,
    pub city_id: Option<String>,
    pub city_name: Option<String>,
    #[serde(alias = "countryCode")]
    pub country: Option<String>,
    pub country_id: Option<LooseInt>,
    pub license_number: Option<String>,
    pub license_expiry: Option<String>,
    #[serde(default)]
    pub license_has_no_expiry: bool,
    pub vehicle_type_id: Option<String>,
    pub vehicle_type_name: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<LooseInt>,
    pub vehicle_number: Option<String>,
    pub vehicle_color: Option<String>,
    pub is_vehicle_owner: Option<bool>,
    pub insurance_number: Option<String>,
    pub insurance_expiry: Option<String>,
    pub vehicle_image_urls: Option<Value>,
    pub subscription_plan: Option<String>,
    pub driver_image_url: Option<String>,
    pub nic_front_url: Option<String>,
    pub nic_back_url: Option<String>,
    pub license_front_url: Option<String>,
    pub license_back_url: Option<String>,
    pub vehicle_registration_url: Option<String>,
    #[serde(alias = "insuranceDocumentUrl")]
    pub vehicle_insurance_url: Option<String>,
    pub billing_proof_url: Option<String>,
}

/// `YYYY-MM-DD`, tolerating a trailing time part
fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, ApiError> {
    let date = raw.trim().get(..10).unwrap_or(raw.trim());
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("Invalid {}: expected YYYY-MM-DD", field)))
}

fn optional_date(raw: Option<String>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    present(raw).map(|d| parse_date(&d, field)).transpose()
}

/// POST /api/driver-verifications - create or update the caller's request
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<DriverSubmissionRequest>,
) -> ApiResult<Submitted<DriverVerification>> {
    let mut required = RequiredFields::default();
    let full_name = required.take(body.full_name, "full_name");
    let date_of_birth = required.take(body.date_of_birth, "date_of_birth");
    let gender = required.take(body.gender, "gender");
    let nic_number = required.take(body.nic_number, "nic_number");
    let phone_number = required.take(body.phone_number, "phone_number");
    let country_code = present(body.country);
    let country_id = body.country_id.as_ref().and_then(LooseInt::as_i32);
    required.check(country_code.is_some() || country_id.is_some(), "country");
    required.finish()?;

    let date_of_birth = parse_date(&date_of_birth, "date_of_birth")?;
    let license_expiry = optional_date(body.license_expiry, "license_expiry")?;
    let insurance_expiry = optional_date(body.insurance_expiry, "insurance_expiry")?;

    let country = state
        .countries
        .resolve(country_code.as_deref(), country_id)
        .await?;
    let email = present(body.email);

    let submission = Submission {
        phone: phone_number.clone(),
        email: email.clone(),
        dialing_prefix: country.phone_prefix.trim_start_matches('+').to_string(),
        country: country.code.clone(),
        documents: vec![
            (DocumentType::DriverImage, body.driver_image_url),
            (DocumentType::NicFront, body.nic_front_url),
            (DocumentType::NicBack, body.nic_back_url),
            (DocumentType::LicenseFront, body.license_front_url),
            (DocumentType::LicenseBack, body.license_back_url),
            (DocumentType::VehicleRegistration, body.vehicle_registration_url),
            (DocumentType::VehicleInsurance, body.vehicle_insurance_url),
            (DocumentType::BillingProof, body.billing_proof_url),
        ],
        profile: DriverProfile {
            first_name: present(body.first_name),
            last_name: present(body.last_name),
            full_name,
            date_of_birth,
            gender,
            nic_number,
            phone_number,
            secondary_mobile: present(body.secondary_mobile),
            email,
            city_id: present(body.city_id),
            city_name: present(body.city_name),
            country: country.code,
            license_number: present(body.license_number),
            license_expiry,
            license_has_no_expiry: body.license_has_no_expiry,
            vehicle_type_id: present(body.vehicle_type_id),
            vehicle_type_name: present(body.vehicle_type_name),
            vehicle_model: present(body.vehicle_model),
            vehicle_year: body.vehicle_year.as_ref().and_then(LooseInt::as_i32),
            vehicle_number: present(body.vehicle_number),
            vehicle_color: present(body.vehicle_color),
            is_vehicle_owner: body.is_vehicle_owner.unwrap_or(true),
            insurance_number: present(body.insurance_number),
            insurance_expiry,
            vehicle_image_urls: body.vehicle_image_urls.filter(|v| !v.is_null()),
            subscription_plan: present(body.subscription_plan)
                .unwrap_or_else(|| "free".to_string()),
        },
    };

    let submitted = state
        .verifications
        .submit::<DriverVerification>(user.user_id, submission)
        .await?;

    Ok(if submitted.created {
        ApiResponse::created(submitted).message("Driver verification submitted successfully")
    } else {
        ApiResponse::success(submitted).message("Driver verification updated successfully")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_accept_plain_and_timestamped_forms() {
        assert_eq!(
            parse_date("1990-04-12", "date_of_birth").unwrap(),
            NaiveDate::from_ymd_opt(1990, 4, 12).unwrap()
        );
        assert_eq!(
            parse_date("1990-04-12T00:00:00.000Z", "date_of_birth").unwrap(),
            NaiveDate::from_ymd_opt(1990, 4, 12).unwrap()
        );
        assert!(parse_date("12/04/1990", "date_of_birth").is_err());
        assert_eq!(optional_date(Some("  ".into()), "license_expiry").unwrap(), None);
    }
}
