use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::database::models::{BusinessVerification, DriverVerification};
use crate::handlers::{admin, protected, public};
use crate::middleware::{error_detail_middleware, jwt_auth_middleware, require_admin_middleware};
use crate::services::VerificationRecord;
use crate::state::AppState;

/// Full HTTP surface over `state`
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(&state))
        .merge(admin_routes(&state))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            error_detail_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/sms/send-otp", post(public::send_otp))
        .route("/api/sms/verify-otp", post(public::verify_otp))
}

/// Applicant routes of one verification flow
fn flow_routes<R: VerificationRecord>() -> Router<AppState> {
    use protected::verification as flow;

    Router::new()
        .route("/user/:userId", get(flow::get_for_user::<R>))
        .route("/check-verification-status", post(flow::check_status::<R>))
        .route("/verify-phone/send-otp", post(flow::send_phone_otp::<R>))
        .route("/verify-phone/verify-otp", post(flow::verify_phone_otp::<R>))
        .route("/verify-email/send-otp", post(flow::send_email_otp::<R>))
        .route("/verify-email/verify-otp", post(flow::verify_email_otp::<R>))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    let business = flow_routes::<BusinessVerification>()
        .route("/", post(protected::business::submit));
    let driver = flow_routes::<DriverVerification>()
        .route("/", post(protected::driver::submit));

    Router::new()
        .nest("/api/business-verifications", business)
        .nest("/api/driver-verifications", driver)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ))
}

/// Review routes of one verification flow
fn review_routes<R: VerificationRecord>() -> Router<AppState> {
    use admin::verification as review;

    Router::new()
        .route("/", get(review::list::<R>))
        .route("/:id", get(review::get::<R>).delete(review::delete::<R>))
        .route("/:id/status", put(review::set_status::<R>))
        .route("/:id/documents/:docType", put(review::set_document_status::<R>))
        .route("/:id/document-status", put(review::set_document_status_by_body::<R>))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/api/business-verifications", review_routes::<BusinessVerification>())
        .nest("/api/driver-verifications", review_routes::<DriverVerification>())
        .route(
            "/api/admin/sms-configurations",
            get(admin::sms::list_configurations),
        )
        .route(
            "/api/admin/sms-configurations/:countryCode",
            get(admin::sms::get_configuration)
                .put(admin::sms::put_configuration)
                .delete(admin::sms::delete_configuration),
        )
        .route("/api/admin/test-sms-provider", post(admin::sms::test_provider))
        .route("/api/admin/sms-analytics", get(admin::sms::analytics))
        .route_layer(middleware::from_fn(require_admin_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ))
}
