use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::present;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::otp::{OtpDispatch, PhoneOtpRequest};
use crate::services::phone::resolve_country;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[serde(alias = "phone", alias = "phone_number")]
    pub phone_number: Option<String>,
    #[serde(alias = "country_code")]
    pub country_code: Option<String>,
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(alias = "phone", alias = "phone_number")]
    pub phone_number: Option<String>,
    #[serde(alias = "code")]
    pub otp: Option<String>,
    #[serde(alias = "otp_id")]
    pub otp_id: Option<String>,
    #[serde(alias = "country_code")]
    pub country_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerified {
    pub verified: bool,
    pub phone_number: String,
    pub otp_id: String,
}

/// Country and dialing prefix for a phone number
pub(crate) async fn phone_country(
    state: &AppState,
    phone: &str,
    country_code: Option<&str>,
) -> Result<(String, String), ApiError> {
    let country = resolve_country(
        country_code,
        phone,
        &state.config.verification.default_country,
    );
    let prefix = state.countries.dialing_prefix(&country).await?;
    Ok((country, prefix))
}

/// POST /api/sms/send-otp
pub async fn send_otp(
    State(state): State<AppState>,
    Json(body): Json<SendOtpRequest>,
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
            purpose: body.purpose.as_deref(),
        })
        .await?;

    Ok(ApiResponse::success(dispatch).message("OTP sent successfully"))
}

/// POST /api/sms/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> ApiResult<OtpVerified> {
    let mut missing = Vec::new();
    let phone = present(body.phone_number);
    let code = present(body.otp);
    if phone.is_none() {
        missing.push("phoneNumber".to_string());
    }
    if code.is_none() {
        missing.push("otp".to_string());
    }
    let (Some(phone), Some(code)) = (phone, code) else {
        return Err(ApiError::missing_fields(&missing));
    };

    let (_, prefix) = phone_country(&state, &phone, body.country_code.as_deref()).await?;
    let challenge = state
        .otp
        .verify_phone(&phone, &prefix, &code, body.otp_id.as_deref())
        .await?;

    Ok(ApiResponse::success(OtpVerified {
        verified: true,
        phone_number: challenge.destination,
        otp_id: challenge.otp_id,
    })
    .message("Phone number verified successfully"))
}
