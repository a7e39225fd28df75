// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::manager::DatabaseError;
use crate::email::EmailError;
use crate::services::otp::OtpError;
use crate::services::VerificationError;
use crate::sms::SmsError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    /// One-time code rejected; `code` lets clients branch without parsing text
    OtpRejected {
        message: String,
        code: &'static str,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError {
        message: String,
        detail: Option<String>,
    },

    // 502 Bad Gateway (SMS/email provider failures)
    BadGateway {
        message: String,
        detail: Option<String>,
    },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::OtpRejected { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError { .. } => 500,
            ApiError::BadGateway { .. } => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::OtpRejected { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::TooManyRequests(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::BadGateway { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Raw upstream error text, only ever sent when error exposure is enabled
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::InternalServerError { detail, .. } | ApiError::BadGateway { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::OtpRejected { code, .. } => code,
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway { .. } => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self, expose_details: bool) -> Value {
        let mut response = json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError {
            field_errors: Some(field_errors),
            ..
        } = self
        {
            response["fieldErrors"] = json!(field_errors);
        }

        if let ApiError::OtpRejected { code, .. } = self {
            if *code == OTP_ALREADY_VERIFIED {
                response["alreadyVerified"] = Value::Bool(true);
            }
        }

        if expose_details {
            if let Some(detail) = self.detail() {
                response["error"] = Value::String(detail.to_string());
            }
        }

        response
    }
}

pub const OTP_INVALID: &str = "INVALID_OTP";
pub const OTP_ALREADY_VERIFIED: &str = "OTP_ALREADY_VERIFIED";
pub const OTP_MAX_ATTEMPTS: &str = "OTP_MAX_ATTEMPTS_EXCEEDED";

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// 400 listing every missing required field
    pub fn missing_fields(fields: &[String]) -> Self {
        let field_errors = fields
            .iter()
            .map(|f| (f.clone(), "This field is required".to_string()))
            .collect();
        ApiError::validation_error(
            format!("Missing required fields: {}", fields.join(", ")),
            Some(field_errors),
        )
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: None,
        }
    }

    pub fn internal_with_detail(message: impl Into<String>, detail: impl ToString) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }

    pub fn bad_gateway(message: impl Into<String>, detail: impl ToString) -> Self {
        ApiError::BadGateway {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::ConfigMissing(name) => {
                tracing::error!("Database configuration missing: {}", name);
                ApiError::service_unavailable("Database is not configured")
            }
            DatabaseError::MigrationError(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_with_detail("Database error occurred", sqlx_err)
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingSecret => {
                tracing::error!("JWT secret is not configured");
                ApiError::internal_server_error("Authentication is not configured")
            }
            AuthError::TokenGeneration(msg) => {
                ApiError::internal_with_detail("Failed to issue token", msg)
            }
            AuthError::InvalidToken(_) => ApiError::unauthorized("Invalid or expired token"),
        }
    }
}

impl From<SmsError> for ApiError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::NotConfigured(country) => ApiError::service_unavailable(format!(
                "SMS service is not configured for country {}",
                country
            )),
            SmsError::Misconfigured { country, reason } => {
                tracing::error!("SMS provider for {} is misconfigured: {}", country, reason);
                ApiError::service_unavailable(format!(
                    "SMS provider for country {} is misconfigured",
                    country
                ))
            }
            SmsError::InvalidConfig(msg) => ApiError::validation_error(msg, None),
            other => {
                tracing::error!("SMS delivery failed: {}", other);
                ApiError::bad_gateway("Failed to send SMS", other)
            }
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::NotConfigured => {
                ApiError::service_unavailable("Email service is not configured")
            }
            other => {
                tracing::error!("Email delivery failed: {}", other);
                ApiError::bad_gateway("Failed to send email", other)
            }
        }
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::RateLimited => ApiError::too_many_requests(
                "Too many verification codes requested. Please try again later.",
            ),
            OtpError::InvalidCode => ApiError::OtpRejected {
                message: "Invalid or expired verification code".to_string(),
                code: OTP_INVALID,
            },
            OtpError::AlreadyVerified => ApiError::OtpRejected {
                message: "This verification code has already been used".to_string(),
                code: OTP_ALREADY_VERIFIED,
            },
            OtpError::MaxAttemptsExceeded => ApiError::OtpRejected {
                message: "Maximum verification attempts exceeded. Please request a new code."
                    .to_string(),
                code: OTP_MAX_ATTEMPTS,
            },
            OtpError::InvalidDestination(msg) => ApiError::bad_request(msg),
            OtpError::Sms(e) => e.into(),
            OtpError::Email(e) => e.into(),
            OtpError::Store(e) => e.into(),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::MissingFields(fields) => ApiError::missing_fields(&fields),
            VerificationError::UnknownCountry(msg) => ApiError::bad_request(msg),
            VerificationError::InvalidDocumentType(doc) => {
                ApiError::bad_request(format!("Invalid document type '{}'", doc))
            }
            VerificationError::InvalidStatus(msg) => ApiError::bad_request(msg),
            VerificationError::NotFound => ApiError::not_found("Verification not found"),
            VerificationError::OutOfScope(country) => {
                ApiError::forbidden(format!("Access denied to country {}", country))
            }
            VerificationError::Database(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

/// Error body including the upstream detail, carried as a response extension.
///
/// `error_detail_middleware` swaps it in when the running config allows it.
#[derive(Debug, Clone)]
pub struct ExposedErrorBody(pub Value);

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.to_json(false))).into_response();
        if self.detail().is_some() {
            response
                .extensions_mut()
                .insert(ExposedErrorBody(self.to_json(true)));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_every_field() {
        let err = ApiError::missing_fields(&["business_name".to_string(), "country".to_string()]);
        assert_eq!(err.status_code(), 400);

        let body = err.to_json(false);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["message"],
            "Missing required fields: business_name, country"
        );
        assert_eq!(body["fieldErrors"]["country"], "This field is required");
    }

    #[test]
    fn detail_is_only_exposed_when_enabled() {
        let err = ApiError::internal_with_detail("Database error occurred", "relation missing");
        assert!(err.to_json(false).get("error").is_none());
        assert_eq!(err.to_json(true)["error"], "relation missing");
    }

    #[test]
    fn otp_errors_carry_client_codes() {
        let err: ApiError = OtpError::AlreadyVerified.into();
        let body = err.to_json(false);
        assert_eq!(body["code"], OTP_ALREADY_VERIFIED);
        assert_eq!(body["alreadyVerified"], true);

        let err: ApiError = OtpError::RateLimited.into();
        assert_eq!(err.status_code(), 429);

        let err: ApiError = OtpError::MaxAttemptsExceeded.into();
        assert_eq!(err.error_code(), OTP_MAX_ATTEMPTS);
    }

    #[test]
    fn database_conflict_maps_to_409() {
        let err: ApiError = DatabaseError::Conflict("duplicate key".into()).into();
        assert_eq!(err.status_code(), 409);
    }
}
