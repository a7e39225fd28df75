use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::database::models::{BusinessProfile, BusinessVerification};
use crate::handlers::{present, LooseInt, RequiredFields};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::verification::{Submission, Submitted};
use crate::services::DocumentType;
use crate::state::AppState;

/// Submission body; camelCase with snake_case aliases for older clients
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSubmissionRequest {
    #[serde(alias = "business_name")]
    pub business_name: Option<String>,
    #[serde(alias = "business_email")]
    pub business_email: Option<String>,
    #[serde(alias = "business_phone")]
    pub business_phone: Option<String>,
    #[serde(alias = "business_address")]
    pub business_address: Option<String>,
    #[serde(alias = "business_category")]
    pub business_category: Option<String>,
    #[serde(alias = "business_description")]
    pub business_description: Option<String>,
    #[serde(alias = "license_number")]
    pub license_number: Option<String>,
    #[serde(alias = "tax_id")]
    pub tax_id: Option<String>,
    #[serde(alias = "countryCode", alias = "country_code")]
    pub country: Option<String>,
    #[serde(alias = "country_id")]
    pub country_id: Option<LooseInt>,
    #[serde(alias = "country_name")]
    pub country_name: Option<String>,
    #[serde(alias = "business_logo_url")]
    pub business_logo_url: Option<String>,
    #[serde(alias = "business_license_url")]
    pub business_license_url: Option<String>,
    #[serde(alias = "insurance_document_url")]
    pub insurance_document_url: Option<String>,
    #[serde(alias = "tax_certificate_url")]
    pub tax_certificate_url: Option<String>,
}

/// POST /api/business-verifications - create or update the caller's request
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<BusinessSubmissionRequest>,
) -> ApiResult<Submitted<BusinessVerification>> {
    let mut required = RequiredFields::default();
    let business_name = required.take(body.business_name, "business_name");
    let business_email = required.take(body.business_email, "business_email");
    let business_phone = required.take(body.business_phone, "business_phone");
    let country_code = present(body.country);
    let country_id = body.country_id.as_ref().and_then(LooseInt::as_i32);
    required.check(country_code.is_some() || country_id.is_some(), "country");
    required.finish()?;

    let country = state
        .countries
        .resolve(country_code.as_deref(), country_id)
        .await?;

    let submission = Submission {
        phone: business_phone.clone(),
        email: Some(business_email.clone()),
        dialing_prefix: country.phone_prefix.trim_start_matches('+').to_string(),
        country: country.code.clone(),
        documents: vec![
            (DocumentType::BusinessLogo, body.business_logo_url),
            (DocumentType::BusinessLicense, body.business_license_url),
            (DocumentType::InsuranceDocument, body.insurance_document_url),
            (DocumentType::TaxCertificate, body.tax_certificate_url),
        ],
        profile: BusinessProfile {
            business_name,
            business_email,
            business_phone,
            business_address: present(body.business_address),
            business_category: present(body.business_category),
            business_description: present(body.business_description),
            license_number: present(body.license_number),
            tax_id: present(body.tax_id),
            country_name: present(body.country_name).or(Some(country.name)),
            country: country.code,
        },
    };

    let submitted = state
        .verifications
        .submit::<BusinessVerification>(user.user_id, submission)
        .await?;

    Ok(if submitted.created {
        ApiResponse::created(submitted).message("Business verification submitted successfully")
    } else {
        ApiResponse::success(submitted).message("Business verification updated successfully")
    })
}
