use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::models::{SmsAnalyticsTotal, SmsProviderConfigRow};
use crate::database::repository::sms_config;
use crate::database::scope::{canonical_country_code, CountryScope};
use crate::error::ApiError;
use crate::handlers::present;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::phone::to_international;
use crate::sms::provider::redact_secrets;
use crate::sms::{ProviderConfig, SmsReceipt, SmsSender};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CountryQuery {
    pub country: Option<String>,
}

/// Stored configuration with credentials masked
fn redacted(mut row: SmsProviderConfigRow) -> SmsProviderConfigRow {
    row.config = redact_secrets(&row.config);
    row
}

fn country_param(raw: &str) -> Result<String, ApiError> {
    canonical_country_code(raw)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid country code '{}'", raw)))
}

async fn refresh_registry(state: &AppState) {
    if let Err(e) = state.load_providers().await {
        tracing::error!("Failed to reload SMS providers: {}", e);
    }
}

/// GET /api/admin/sms-configurations
pub async fn list_configurations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CountryQuery>,
) -> ApiResult<Vec<SmsProviderConfigRow>> {
    let scope = CountryScope::for_user(&user, query.country.as_deref())?;
    let rows = sms_config::list(state.db.pool(), scope.country()).await?;
    Ok(ApiResponse::success(rows.into_iter().map(redacted).collect()))
}

/// GET /api/admin/sms-configurations/:countryCode - the active configuration
pub async fn get_configuration(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(country): Path<String>,
) -> ApiResult<SmsProviderConfigRow> {
    let country = country_param(&country)?;
    let scope = CountryScope::for_user(&user, None)?;
    scope.ensure_visible(&country, "SMS configuration")?;

    let row = sms_config::for_country(state.db.pool(), &country)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No SMS configuration for {}", country)))?;
    Ok(ApiResponse::success(redacted(row)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationRequest {
    pub provider: Option<String>,
    #[serde(default)]
    pub config: Value,
    pub is_active: Option<bool>,
    /// Deactivate the country's other providers; defaults to true
    pub exclusive: Option<bool>,
}

/// PUT /api/admin/sms-configurations/:countryCode
pub async fn put_configuration(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(country): Path<String>,
    Json(body): Json<ConfigurationRequest>,
) -> ApiResult<SmsProviderConfigRow> {
    let country = country_param(&country)?;
    CountryScope::for_user(&user, None)?.ensure_mutable(&country)?;

    let provider = present(body.provider)
        .ok_or_else(|| ApiError::missing_fields(&["provider".to_string()]))?;

    let parsed = ProviderConfig::from_parts(&provider, body.config.clone())?;
    parsed.build()?;

    let is_active = body.is_active.unwrap_or(true);
    let mut tx = state.db.pool().begin().await.map_err(crate::database::DatabaseError::from)?;
    let row = sms_config::upsert(&mut tx, &country, parsed.provider_name(), &body.config, is_active)
        .await?;
    if is_active && body.exclusive.unwrap_or(true) {
        let deactivated = sms_config::deactivate_others(&mut tx, &country, parsed.provider_name())
            .await?;
        if deactivated > 0 {
            tracing::info!("Deactivated {} other SMS providers for {}", deactivated, country);
        }
    }
    tx.commit().await.map_err(crate::database::DatabaseError::from)?;

    tracing::info!(
        "SMS provider for {} set to {} by {}",
        country,
        parsed.provider_name(),
        user.user_id
    );
    refresh_registry(&state).await;

    Ok(ApiResponse::success(redacted(row)).message("SMS configuration saved"))
}

/// DELETE /api/admin/sms-configurations/:countryCode - super admins only
pub async fn delete_configuration(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(country): Path<String>,
) -> ApiResult<Value> {
    user.require_super_admin()?;
    let country = country_param(&country)?;

    let removed = sms_config::delete_country(state.db.pool(), &country).await?;
    if removed == 0 {
        return Err(ApiError::not_found(format!("No SMS configuration for {}", country)));
    }
    refresh_registry(&state).await;

    Ok(ApiResponse::success(serde_json::json!({ "countryCode": country, "removed": removed }))
        .message("SMS configuration deleted"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSmsRequest {
    #[serde(alias = "country")]
    pub country_code: Option<String>,
    #[serde(alias = "phoneNumber")]
    pub test_number: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSmsResult {
    pub country_code: String,
    pub to: String,
    #[serde(flatten)]
    pub receipt: SmsReceipt,
}

/// POST /api/admin/test-sms-provider
pub async fn test_provider(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<TestSmsRequest>,
) -> ApiResult<TestSmsResult> {
    let (Some(country), Some(number)) = (present(body.country_code), present(body.test_number))
    else {
        return Err(ApiError::missing_fields(&[
            "countryCode".to_string(),
            "testNumber".to_string(),
        ]));
    };
    let country = country_param(&country)?;
    CountryScope::for_user(&user, None)?.ensure_mutable(&country)?;

    let prefix = state.countries.dialing_prefix(&country).await?;
    let to = to_international(&number, &prefix);
    let message = present(body.message)
        .unwrap_or_else(|| "Test message from the marketplace admin console".to_string());

    let provider = state.sms.provider_for(&country).await?;
    let outcome = provider.send_sms(&to, &message).await;

    let (cost, success) = match &outcome {
        Ok(receipt) => (receipt.cost, true),
        Err(_) => (0.0, false),
    };
    if let Err(e) =
        sms_config::record_delivery(state.db.pool(), &country, provider.name(), cost, success).await
    {
        tracing::warn!("Failed to record SMS analytics: {}", e);
    }

    let receipt = outcome?;
    Ok(ApiResponse::success(TestSmsResult {
        country_code: country,
        to,
        receipt,
    })
    .message("Test SMS sent"))
}

/// GET /api/admin/sms-analytics
pub async fn analytics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CountryQuery>,
) -> ApiResult<Vec<SmsAnalyticsTotal>> {
    let scope = CountryScope::for_user(&user, query.country.as_deref())?;
    let totals = sms_config::analytics(state.db.pool(), scope.country()).await?;
    Ok(ApiResponse::success(totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn listed_configurations_hide_credentials() {
        let row = SmsProviderConfigRow {
            id: 1,
            country_code: "LK".into(),
            provider: "twilio".into(),
            config: json!({"accountSid": "AC1", "authToken": "secret", "fromNumber": "+1555"}),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let row = redacted(row);
        assert_eq!(row.config["authToken"], "********");
        assert_eq!(row.config["accountSid"], "AC1");
    }

    #[test]
    fn country_path_is_canonicalised() {
        assert_eq!(country_param(" lk ").unwrap(), "LK");
        assert!(country_param("Sri Lanka").is_err());
    }
}
