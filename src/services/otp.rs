use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::OtpConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{NewOtpChallenge, OtpChallenge};
use crate::email::{EmailChannel, EmailError};
use crate::services::clock::{Clock, SystemClock};
use crate::services::phone::{digits_only, normalize_email, to_international};
use crate::sms::{SmsError, SmsRegistry, SmsSender};
use crate::types::ContactKind;

/// Provider name recorded for codes issued without a real gateway
pub const DEV_FALLBACK_PROVIDER: &str = "dev_fallback";

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("Too many verification codes requested")]
    RateLimited,

    #[error("Invalid or expired verification code")]
    InvalidCode,

    #[error("Verification code already used")]
    AlreadyVerified,

    #[error("Maximum verification attempts exceeded")]
    MaxAttemptsExceeded,

    #[error("{0}")]
    InvalidDestination(String),

    #[error(transparent)]
    Sms(#[from] SmsError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Result of a conditional consume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Verified,
    AlreadyVerified,
    /// Attempts ran out before the consume landed
    Exhausted,
}

/// Persistence for one-time code challenges
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Challenges created for `destination` at or after `since`
    async fn count_since(
        &self,
        kind: ContactKind,
        destination: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, DatabaseError>;

    /// Expire every unverified, unexpired challenge for `destination`
    async fn expire_outstanding(
        &self,
        kind: ContactKind,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError>;

    async fn insert(
        &self,
        kind: ContactKind,
        challenge: &NewOtpChallenge,
    ) -> Result<OtpChallenge, DatabaseError>;

    /// Challenges whose code matches, newest first, in any state
    async fn find_matching(
        &self,
        kind: ContactKind,
        destination: &str,
        code: &str,
        otp_id: Option<&str>,
    ) -> Result<Vec<OtpChallenge>, DatabaseError>;

    /// Unverified, unexpired challenges, newest first
    async fn outstanding(
        &self,
        kind: ContactKind,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<OtpChallenge>, DatabaseError>;

    async fn increment_attempts(
        &self,
        kind: ContactKind,
        ids: &[i64],
    ) -> Result<(), DatabaseError>;

    /// Consume the challenge only while it is unverified with attempts left
    async fn mark_verified(
        &self,
        kind: ContactKind,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, DatabaseError>;

    async fn record_sms_delivery(
        &self,
        country_code: &str,
        provider: &str,
        cost: f64,
        success: bool,
    ) -> Result<(), DatabaseError>;
}

#[derive(Debug, Clone)]
pub struct PhoneOtpRequest<'a> {
    pub phone: &'a str,
    pub country_code: &'a str,
    pub dialing_prefix: &'a str,
    pub purpose: Option<&'a str>,
}

/// Result of a successful send
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpDispatch {
    pub otp_id: String,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub provider: String,
    pub expires_in: i64,
    /// Only set for the development fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

pub struct OtpService<S> {
    store: S,
    sms: SmsRegistry,
    email: EmailChannel,
    config: OtpConfig,
    production: bool,
    clock: Arc<dyn Clock>,
}

impl<S: OtpStore> OtpService<S> {
    pub fn new(
        store: S,
        sms: SmsRegistry,
        email: EmailChannel,
        config: OtpConfig,
        production: bool,
    ) -> Self {
        Self {
            store,
            sms,
            email,
            config,
            production,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::rng();
        (0..self.config.code_length.max(4))
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect()
    }

    fn message(&self, code: &str) -> String {
        format!(
            "Your marketplace verification code is: {}. Valid for {} minutes.",
            code,
            (self.config.expiry_secs / 60).max(1)
        )
    }

    async fn check_rate_limit(
        &self,
        kind: ContactKind,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        let since = now - Duration::seconds(self.config.rate_limit_window_secs);
        let sent = self.store.count_since(kind, destination, since).await?;
        if sent >= self.config.rate_limit_max {
            tracing::warn!("OTP rate limit hit for {} {}", kind, destination);
            return Err(OtpError::RateLimited);
        }
        Ok(())
    }

    async fn store_challenge(
        &self,
        kind: ContactKind,
        destination: &str,
        code: String,
        country_code: Option<&str>,
        purpose: Option<&str>,
        provider: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpDispatch, OtpError> {
        let superseded = self.store.expire_outstanding(kind, destination, now).await?;
        if superseded > 0 {
            tracing::debug!("Superseded {} outstanding challenges for {}", superseded, destination);
        }

        let challenge = NewOtpChallenge {
            otp_id: format!("otp_{}", Uuid::new_v4().simple()),
            destination: destination.to_string(),
            otp: code,
            country_code: country_code.map(str::to_string),
            purpose: purpose.map(str::to_string),
            expires_at: now + Duration::seconds(self.config.expiry_secs),
            max_attempts: self.config.max_attempts,
            provider_used: provider.to_string(),
            created_at: now,
        };
        let stored = self.store.insert(kind, &challenge).await?;

        Ok(OtpDispatch {
            otp_id: stored.otp_id,
            destination: stored.destination,
            country_code: stored.country_code,
            provider: provider.to_string(),
            expires_in: self.config.expiry_secs,
            dev_code: (provider == DEV_FALLBACK_PROVIDER).then_some(stored.otp),
        })
    }

    /// Send a code by SMS through the country's configured provider
    pub async fn send_phone(&self, request: PhoneOtpRequest<'_>) -> Result<OtpDispatch, OtpError> {
        if digits_only(request.phone).len() < 7 {
            return Err(OtpError::InvalidDestination(
                "A valid phone number is required".to_string(),
            ));
        }

        let destination = to_international(request.phone, request.dialing_prefix);
        let now = self.clock.now();
        self.check_rate_limit(ContactKind::Phone, &destination, now).await?;

        let provider = match self.sms.provider_for(request.country_code).await {
            Ok(provider) => Some(provider),
            Err(SmsError::NotConfigured(_)) if !self.production => None,
            Err(e) => return Err(e.into()),
        };

        let (code, provider_name) = match provider {
            Some(provider) => {
                let code = self.generate_code();
                match provider.send_sms(&destination, &self.message(&code)).await {
                    Ok(receipt) => {
                        if let Err(e) = self
                            .store
                            .record_sms_delivery(
                                request.country_code,
                                receipt.provider,
                                receipt.cost,
                                true,
                            )
                            .await
                        {
                            tracing::warn!("Failed to record SMS analytics: {}", e);
                        }
                        tracing::info!(
                            "OTP sent to {} via {} ({})",
                            destination,
                            receipt.provider,
                            receipt.message_id
                        );
                        (code, provider.name())
                    }
                    Err(e) => {
                        if let Err(err) = self
                            .store
                            .record_sms_delivery(request.country_code, provider.name(), 0.0, false)
                            .await
                        {
                            tracing::warn!("Failed to record SMS analytics: {}", err);
                        }
                        tracing::error!("OTP delivery to {} failed: {}", destination, e);
                        return Err(e.into());
                    }
                }
            }
            None => {
                let code = self.config.dev_fallback_code.clone();
                tracing::warn!(
                    "No SMS provider for {}; development code {} issued to {}",
                    request.country_code,
                    code,
                    destination
                );
                (code, DEV_FALLBACK_PROVIDER)
            }
        };

        self.store_challenge(
            ContactKind::Phone,
            &destination,
            code,
            Some(request.country_code),
            request.purpose,
            provider_name,
            now,
        )
        .await
    }

    /// Send a code by email (Brevo), or the development code when email is not configured
    pub async fn send_email(
        &self,
        email: &str,
        purpose: Option<&str>,
    ) -> Result<OtpDispatch, OtpError> {
        let destination = normalize_email(email);
        if !destination.contains('@') {
            return Err(OtpError::InvalidDestination(
                "A valid email address is required".to_string(),
            ));
        }

        let now = self.clock.now();
        self.check_rate_limit(ContactKind::Email, &destination, now).await?;

        let (code, provider_name) = if self.email.is_configured() {
            let code = self.generate_code();
            let message_id = self
                .email
                .send(&destination, "Your verification code", &self.message(&code))
                .await?;
            tracing::info!("Email OTP sent to {} ({})", destination, message_id);
            (code, self.email.provider_name())
        } else if !self.production {
            let code = self.config.dev_fallback_code.clone();
            tracing::warn!(
                "Email delivery not configured; development code {} issued to {}",
                code,
                destination
            );
            (code, DEV_FALLBACK_PROVIDER)
        } else {
            return Err(EmailError::NotConfigured.into());
        };

        self.store_challenge(
            ContactKind::Email,
            &destination,
            code,
            None,
            purpose,
            provider_name,
            now,
        )
        .await
    }

    pub async fn verify_phone(
        &self,
        phone: &str,
        dialing_prefix: &str,
        code: &str,
        otp_id: Option<&str>,
    ) -> Result<OtpChallenge, OtpError> {
        let destination = to_international(phone, dialing_prefix);
        self.verify(ContactKind::Phone, &destination, code, otp_id).await
    }

    pub async fn verify_email(
        &self,
        email: &str,
        code: &str,
        otp_id: Option<&str>,
    ) -> Result<OtpChallenge, OtpError> {
        let destination = normalize_email(email);
        self.verify(ContactKind::Email, &destination, code, otp_id).await
    }

    /// Consume the newest live challenge matching `code`.
    ///
    /// A wrong code counts as an attempt against every outstanding challenge
    /// for the destination, not just the targeted one.
    async fn verify(
        &self,
        kind: ContactKind,
        destination: &str,
        code: &str,
        otp_id: Option<&str>,
    ) -> Result<OtpChallenge, OtpError> {
        let code = code.trim();
        let otp_id = otp_id.map(str::trim).filter(|id| !id.is_empty());
        let now = self.clock.now();

        let matching = if code.is_empty() {
            Vec::new()
        } else {
            self.store.find_matching(kind, destination, code, otp_id).await?
        };

        if let Some(challenge) = matching.iter().find(|c| c.is_outstanding(now)) {
            if challenge.is_exhausted() {
                return Err(OtpError::MaxAttemptsExceeded);
            }
            match self.store.mark_verified(kind, challenge.id, now).await? {
                ConsumeOutcome::Verified => {}
                ConsumeOutcome::AlreadyVerified => return Err(OtpError::AlreadyVerified),
                ConsumeOutcome::Exhausted => return Err(OtpError::MaxAttemptsExceeded),
            }

            tracing::info!("Verified {} {} ({})", kind, destination, challenge.otp_id);
            let mut verified = challenge.clone();
            verified.verified = true;
            verified.verified_at = Some(now);
            return Ok(verified);
        }

        if matching.iter().any(|c| c.verified) {
            return Err(OtpError::AlreadyVerified);
        }

        let outstanding = self.store.outstanding(kind, destination, now).await?;
        if outstanding.is_empty() {
            return Err(OtpError::InvalidCode);
        }

        if let Some(id) = otp_id {
            if outstanding.iter().any(|c| c.otp_id == id && c.is_exhausted()) {
                return Err(OtpError::MaxAttemptsExceeded);
            }
        }

        let ids: Vec<i64> = outstanding.iter().map(|c| c.id).collect();
        self.store.increment_attempts(kind, &ids).await?;
        tracing::debug!("Wrong code for {}; {} challenges penalised", destination, ids.len());

        Err(OtpError::InvalidCode)
    }
}
