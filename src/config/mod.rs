use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub otp: OtpConfig,
    pub verification: VerificationConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    /// Include raw database/provider error text in error responses.
    pub expose_error_details: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    pub code_length: usize,
    pub expiry_secs: i64,
    pub max_attempts: i32,
    pub rate_limit_max: i64,
    pub rate_limit_window_secs: i64,
    pub dev_fallback_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub default_country: String,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub country_cache_ttl_secs: u64,
    pub country_cache_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(skip_serializing)]
    pub brevo_api_key: Option<String>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.brevo_api_key.as_deref().is_some_and(|v| !v.trim().is_empty())
            && self.sender_email.as_deref().is_some_and(|v| !v.trim().is_empty())
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }

        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout_secs =
                v.parse().unwrap_or(self.database.connection_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_EXPOSE_ERROR_DETAILS") {
            self.security.expose_error_details =
                v.parse().unwrap_or(self.security.expose_error_details);
        }

        if let Ok(v) = env::var("OTP_EXPIRY_SECS") {
            self.otp.expiry_secs = v.parse().unwrap_or(self.otp.expiry_secs);
        }
        if let Ok(v) = env::var("OTP_MAX_ATTEMPTS") {
            self.otp.max_attempts = v.parse().unwrap_or(self.otp.max_attempts);
        }
        if let Ok(v) = env::var("OTP_RATE_LIMIT_MAX") {
            self.otp.rate_limit_max = v.parse().unwrap_or(self.otp.rate_limit_max);
        }
        if let Ok(v) = env::var("OTP_RATE_LIMIT_WINDOW_SECS") {
            self.otp.rate_limit_window_secs =
                v.parse().unwrap_or(self.otp.rate_limit_window_secs);
        }

        if let Ok(v) = env::var("DEFAULT_COUNTRY") {
            self.verification.default_country = v.trim().to_uppercase();
        }

        if let Ok(v) = env::var("BREVO_API_KEY") {
            self.email.brevo_api_key = Some(v);
        }
        if let Ok(v) = env::var("BREVO_SENDER_EMAIL") {
            self.email.sender_email = Some(v);
        }
        if let Ok(v) = env::var("BREVO_SENDER_NAME") {
            self.email.sender_name = Some(v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout_secs: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: "development-only-jwt-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                expose_error_details: true,
            },
            otp: OtpConfig::default(),
            verification: VerificationConfig::default(),
            email: EmailConfig::default(),
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout_secs: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging-admin.example.com".to_string()],
                expose_error_details: false,
            },
            otp: OtpConfig::default(),
            verification: VerificationConfig::default(),
            email: EmailConfig::default(),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout_secs: 5,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://admin.example.com".to_string()],
                expose_error_details: false,
            },
            otp: OtpConfig::default(),
            verification: VerificationConfig {
                country_cache_ttl_secs: 600,
                ..VerificationConfig::default()
            },
            email: EmailConfig::default(),
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            expiry_secs: 5 * 60,
            max_attempts: 3,
            rate_limit_max: 10,
            rate_limit_window_secs: 60 * 60,
            dev_fallback_code: "123456".to_string(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            default_country: "LK".to_string(),
            default_page_size: 10,
            max_page_size: 100,
            country_cache_ttl_secs: 60,
            country_cache_capacity: 256,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        $crate::config::CONFIG.is_production()
    };
}
