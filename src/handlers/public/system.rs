use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Marketplace Admin API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "sms": "/api/sms/send-otp, /api/sms/verify-otp (public)",
                "business": "/api/business-verifications[/...] (protected)",
                "driver": "/api/driver-verifications[/...] (protected)",
                "admin": "/api/admin/sms-configurations, /api/admin/sms-analytics (admin)",
            }
        }
    }))
}

/// GET /health - database connectivity and loaded SMS providers
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let providers = state.sms.summary().await.len();

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "smsProviders": providers,
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "Database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
