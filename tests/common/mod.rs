#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

use marketplace_admin_api::auth::{issue_token, Claims, Role};
use marketplace_admin_api::config::AppConfig;
use marketplace_admin_api::database::DatabaseManager;
use marketplace_admin_api::{router, AppState};

static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Router over a real database
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub secret: String,
}

/// `None` when TEST_DATABASE_URL is unset
pub async fn test_app() -> Result<Option<TestApp>> {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();

    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping integration test");
        return Ok(None);
    };

    let db = DatabaseManager::connect_url(&url, 5, 10)
        .await
        .context("failed to connect to TEST_DATABASE_URL")?;
    MIGRATED
        .get_or_try_init(|| async { db.migrate().await })
        .await
        .context("failed to migrate test database")?;

    let mut config = AppConfig::development();
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.database.url = Some(url);
    let secret = config.security.jwt_secret.clone();

    let state = AppState::new(Arc::new(config), db);
    state.load_providers().await?;

    Ok(Some(TestApp {
        router: router(state.clone()),
        state,
        secret,
    }))
}

impl TestApp {
    pub fn pool(&self) -> &sqlx::PgPool {
        self.state.db.pool()
    }

    pub fn token(&self, user_id: Uuid, role: Role, country: Option<&str>) -> String {
        let claims = Claims::new(user_id, role, country.map(str::to_string), 1);
        issue_token(&claims, &self.secret).expect("token")
    }

    /// Insert a `users` row and return a bearer token for it
    pub async fn user(&self, phone: Option<&str>, email: Option<&str>) -> Result<(Uuid, String)> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, phone, email) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(phone)
            .bind(email)
            .execute(self.pool())
            .await?;
        Ok((id, self.token(id, Role::User, None)))
    }

    pub fn super_admin(&self) -> String {
        self.token(Uuid::new_v4(), Role::SuperAdmin, None)
    }

    pub fn country_admin(&self, country: &str) -> String {
        self.token(Uuid::new_v4(), Role::CountryAdmin, Some(country))
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => request.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Code stored for an issued phone challenge
    pub async fn issued_code(&self, otp_id: &str) -> Result<String> {
        let code: String =
            sqlx::query_scalar("SELECT otp FROM phone_otp_verifications WHERE otp_id = $1")
                .bind(otp_id)
                .fetch_one(self.pool())
                .await?;
        Ok(code)
    }

    pub async fn issued_email_code(&self, otp_id: &str) -> Result<String> {
        let code: String =
            sqlx::query_scalar("SELECT otp FROM email_otp_verifications WHERE otp_id = $1")
                .bind(otp_id)
                .fetch_one(self.pool())
                .await?;
        Ok(code)
    }
}

/// Sri Lankan mobile number in local form, fresh per call
pub fn fresh_lk_mobile() -> String {
    let digits = Uuid::new_v4().as_u128() % 10_000_000;
    format!("077{:07}", digits)
}

pub fn international(local: &str) -> String {
    format!("+94{}", local.trim_start_matches('0'))
}

pub fn fresh_email() -> String {
    format!("owner-{}@shop.example", Uuid::new_v4().simple())
}
