// Endpoints shared by the business and driver flows, generic over the record type:
//   GET  /api/<flow>/user/:userId
//   POST /api/<flow>/check-verification-status
//   POST /api/<flow>/verify-phone/{send-otp,verify-otp}
//   POST /api/<flow>/verify-email/{send-otp,verify-otp}

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::format::with_fields;
use crate::database::scope::CountryScope;
use crate::error::ApiError;
use crate::handlers::present;
use crate::handlers::public::otp::phone_country;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::otp::{OtpDispatch, PhoneOtpRequest};
use crate::services::verification::{ContactReport, VerificationRecord};
use crate::state::AppState;
use crate::types::ContactKind;

/// GET /api/<flow>/user/:userId
pub async fn get_for_user<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Value> {
    if !user.is_self(user_id) {
        user.require_admin()?;
    }

    let not_found = || ApiError::not_found(format!("No {} found", R::KIND.label().to_lowercase()));
    let record = R::find_for_user(state.db.pool(), user_id)
        .await?
        .ok_or_else(not_found)?;

    if !user.is_self(user_id) {
        CountryScope::for_user(&user, None)?.ensure_visible(record.country(), R::KIND.label())?;
    }

    let (phone_verified, email_verified) = record.contact_flags();
    let value = with_fields(
        &record,
        json!({
            "requiresPhoneVerification": !phone_verified,
            "requiresEmailVerification": !email_verified,
        }),
    )
    .map_err(|e| ApiError::internal_with_detail("Failed to serialize verification", e))?;

    Ok(ApiResponse::success(value))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusRequest {
    pub user_id: Option<Uuid>,
    #[serde(alias = "phone", alias = "businessPhone")]
    pub phone_number: Option<String>,
    #[serde(alias = "businessEmail")]
    pub email: Option<String>,
    #[serde(alias = "country")]
    pub country_code: Option<String>,
}

/// POST /api/<flow>/check-verification-status
///
/// Resolver only; no request row is written. Backfill of the primary contact
/// happens only when the caller checks their own account.
pub async fn check_status<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CheckStatusRequest>,
) -> ApiResult<ContactReport> {
    let target = body.user_id.unwrap_or(user.user_id);
    if !user.is_self(target) {
        user.require_admin()?;
    }

    let phone = present(body.phone_number);
    let email = present(body.email);
    if phone.is_none() && email.is_none() {
        return Err(ApiError::missing_fields(&[
            "phoneNumber".to_string(),
            "email".to_string(),
        ]));
    }

    let (_, prefix) = phone_country(
        &state,
        phone.as_deref().unwrap_or_default(),
        body.country_code.as_deref(),
    )
    .await?;

    let report = state
        .verifications
        .check_contacts(
            target,
            phone.as_deref(),
            email.as_deref(),
            &prefix,
            user.is_self(target),
        )
        .await;

    tracing::debug!(
        "{} status check for {}: phone={} email={}",
        R::KIND.label(),
        target,
        report.phone.verified,
        report.email.verified
    );
    Ok(ApiResponse::success(report))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneOtpBody {
    #[serde(alias = "phone")]
    pub phone_number: Option<String>,
    #[serde(alias = "country")]
    pub country_code: Option<String>,
    #[serde(alias = "code")]
    pub otp: Option<String>,
    pub otp_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailOtpBody {
    pub email: Option<String>,
    #[serde(alias = "code")]
    pub otp: Option<String>,
    pub otp_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactVerified {
    pub verified: bool,
    pub contact: String,
    /// `None` when the user has not submitted a request yet
    pub is_verified: Option<bool>,
}

fn required_pair(
    first: (Option<String>, &str),
    second: (Option<String>, &str),
) -> Result<(String, String), ApiError> {
    let a = present(first.0);
    let b = present(second.0);
    match (a, b) {
        (Some(a), Some(b)) => Ok((a, b)),
        (a, b) => {
            let mut missing = Vec::new();
            if a.is_none() {
                missing.push(first.1.to_string());
            }
            if b.is_none() {
                missing.push(second.1.to_string());
            }
            Err(ApiError::missing_fields(&missing))
        }
    }
}

/// POST /api/<flow>/verify-phone/send-otp
pub async fn send_phone_otp<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<PhoneOtpBody>,
) -> ApiResult<OtpDispatch> {
    let phone = present(body.phone_number)
        .ok_or_else(|| ApiError::missing_fields(&["phoneNumber".to_string()]))?;
    let (country, prefix) = phone_country(&state, &phone, body.country_code.as_deref()).await?;

    let dispatch = state
        .otp
        .send_phone(PhoneOtpRequest {
            phone: &phone,
            country_code: &country,
            dialing_prefix: &prefix,
            purpose: Some(R::KIND.contact_purpose()),
        })
        .await?;

    tracing::info!("{} phone OTP requested by {}", R::KIND.label(), user.user_id);
    Ok(ApiResponse::success(dispatch).message("OTP sent successfully"))
}

/// POST /api/<flow>/verify-phone/verify-otp
pub async fn verify_phone_otp<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<PhoneOtpBody>,
) -> ApiResult<ContactVerified> {
    let (phone, code) = required_pair((body.phone_number, "phoneNumber"), (body.otp, "otp"))?;
    let (_, prefix) = phone_country(&state, &phone, body.country_code.as_deref()).await?;

    let challenge = state
        .otp
        .verify_phone(&phone, &prefix, &code, body.otp_id.as_deref())
        .await?;

    let snapshot = state
        .verifications
        .record_verified_contact(
            R::KIND,
            user.user_id,
            ContactKind::Phone,
            &challenge.destination,
            &prefix,
        )
        .await?;

    Ok(ApiResponse::success(ContactVerified {
        verified: true,
        contact: challenge.destination,
        is_verified: snapshot.map(|s| s.is_verified),
    })
    .message("Phone number verified successfully"))
}

/// POST /api/<flow>/verify-email/send-otp
pub async fn send_email_otp<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<EmailOtpBody>,
) -> ApiResult<OtpDispatch> {
    let email = present(body.email)
        .ok_or_else(|| ApiError::missing_fields(&["email".to_string()]))?;

    let dispatch = state
        .otp
        .send_email(&email, Some(R::KIND.contact_purpose()))
        .await?;

    tracing::info!("{} email OTP requested by {}", R::KIND.label(), user.user_id);
    Ok(ApiResponse::success(dispatch).message("Verification code sent"))
}

/// POST /api/<flow>/verify-email/verify-otp
pub async fn verify_email_otp<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<EmailOtpBody>,
) -> ApiResult<ContactVerified> {
    let (email, code) = required_pair((body.email, "email"), (body.otp, "otp"))?;

    let challenge = state
        .otp
        .verify_email(&email, &code, body.otp_id.as_deref())
        .await?;

    let snapshot = state
        .verifications
        .record_verified_contact(
            R::KIND,
            user.user_id,
            ContactKind::Email,
            &challenge.destination,
            "",
        )
        .await?;

    Ok(ApiResponse::success(ContactVerified {
        verified: true,
        contact: challenge.destination,
        is_verified: snapshot.map(|s| s.is_verified),
    })
    .message("Email verified successfully"))
}
