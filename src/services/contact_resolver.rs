use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::services::phone::{normalize_email, normalize_phone, to_international};
use crate::types::ContactKind;

/// Where a verified contact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationSource {
    #[serde(rename = "user_phone_numbers")]
    UserPhoneNumbers,
    #[serde(rename = "user_email_addresses")]
    UserEmailAddresses,
    #[serde(rename = "registration")]
    Registration,
    #[serde(rename = "otp")]
    Otp,
    #[serde(rename = "unverified")]
    Unverified,
}

impl VerificationSource {
    fn professional(kind: ContactKind) -> Self {
        match kind {
            ContactKind::Phone => VerificationSource::UserPhoneNumbers,
            ContactKind::Email => VerificationSource::UserEmailAddresses,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationSource::UserPhoneNumbers => "user_phone_numbers",
            VerificationSource::UserEmailAddresses => "user_email_addresses",
            VerificationSource::Registration => "registration",
            VerificationSource::Otp => "otp",
            VerificationSource::Unverified => "unverified",
        }
    }
}

impl fmt::Display for VerificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactVerification {
    pub verified: bool,
    pub source: VerificationSource,
    /// The primary `users` row was written while resolving
    pub needs_update: bool,
    pub requires_manual_verification: bool,
}

impl ContactVerification {
    fn verified(source: VerificationSource, needs_update: bool) -> Self {
        Self {
            verified: true,
            source,
            needs_update,
            requires_manual_verification: false,
        }
    }

    pub fn manual(needs_update: bool) -> Self {
        Self {
            verified: false,
            source: VerificationSource::Unverified,
            needs_update,
            requires_manual_verification: true,
        }
    }
}

/// Primary contact on the user's account row
#[derive(Debug, Clone, Default)]
pub struct PrimaryContact {
    pub value: Option<String>,
    pub verified: bool,
}

/// Data sources consulted by [`ContactResolver`]
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Verified professional contacts (`user_phone_numbers` / `user_email_addresses`)
    async fn verified_contacts(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<Vec<String>, DatabaseError>;

    /// `None` when the user row does not exist
    async fn primary_contact(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<Option<PrimaryContact>, DatabaseError>;

    async fn backfill_primary(
        &self,
        user_id: Uuid,
        kind: ContactKind,
        value: &str,
    ) -> Result<(), DatabaseError>;

    async fn mark_primary_verified(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<(), DatabaseError>;

    /// Any consumed one-time code for one of `destinations`
    async fn has_verified_otp(
        &self,
        kind: ContactKind,
        destinations: &[String],
    ) -> Result<bool, DatabaseError>;
}

#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    pub user_id: Uuid,
    pub kind: ContactKind,
    pub claimed: &'a str,
    /// Dialing prefix of the country the number belongs to, e.g. `94`
    pub dialing_prefix: &'a str,
    /// Only the account owner may have a missing primary contact filled in
    pub allow_backfill: bool,
}

/// Decides whether a claimed phone/email is already verified for a user
pub struct ContactResolver<S> {
    store: S,
}

impl<S: ContactStore> ContactResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve verification status. Store failures fail closed.
    pub async fn resolve(&self, request: ResolveRequest<'_>) -> ContactVerification {
        match self.try_resolve(&request).await {
            Ok(result) => {
                tracing::debug!(
                    "Resolved {} for user {}: verified={} source={}",
                    request.kind,
                    request.user_id,
                    result.verified,
                    result.source
                );
                result
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to resolve {} verification for user {}: {}",
                    request.kind,
                    request.user_id,
                    e
                );
                ContactVerification::manual(false)
            }
        }
    }

    fn normalize(&self, request: &ResolveRequest<'_>, value: &str) -> String {
        match request.kind {
            ContactKind::Phone => normalize_phone(value, request.dialing_prefix),
            ContactKind::Email => normalize_email(value),
        }
    }

    async fn try_resolve(
        &self,
        request: &ResolveRequest<'_>,
    ) -> Result<ContactVerification, DatabaseError> {
        let claimed = self.normalize(request, request.claimed);
        if claimed.is_empty() {
            return Ok(ContactVerification::manual(false));
        }

        let professional = self
            .store
            .verified_contacts(request.user_id, request.kind)
            .await?;
        if professional
            .iter()
            .any(|value| self.normalize(request, value) == claimed)
        {
            return Ok(ContactVerification::verified(
                VerificationSource::professional(request.kind),
                false,
            ));
        }

        let primary = match self
            .store
            .primary_contact(request.user_id, request.kind)
            .await?
        {
            Some(primary) => primary,
            None => return Ok(ContactVerification::manual(false)),
        };

        let primary_value = primary
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let primary_value = match primary_value {
            Some(value) => value,
            None => {
                if !request.allow_backfill {
                    return Ok(ContactVerification::manual(false));
                }
                self.store
                    .backfill_primary(request.user_id, request.kind, request.claimed.trim())
                    .await?;
                tracing::info!(
                    "Backfilled primary {} for user {}",
                    request.kind,
                    request.user_id
                );
                return Ok(ContactVerification::manual(true));
            }
        };

        if self.normalize(request, primary_value) != claimed {
            return Ok(ContactVerification::manual(false));
        }

        if primary.verified {
            return Ok(ContactVerification::verified(
                VerificationSource::Registration,
                false,
            ));
        }

        let destinations = self.otp_destinations(request, primary_value);
        if self
            .store
            .has_verified_otp(request.kind, &destinations)
            .await?
        {
            self.store
                .mark_primary_verified(request.user_id, request.kind)
                .await?;
            tracing::info!(
                "Promoted primary {} for user {} from OTP history",
                request.kind,
                request.user_id
            );
            return Ok(ContactVerification::verified(VerificationSource::Otp, true));
        }

        Ok(ContactVerification::manual(false))
    }

    /// Spellings the OTP history may hold for this contact
    fn otp_destinations(&self, request: &ResolveRequest<'_>, primary_value: &str) -> Vec<String> {
        let mut destinations = match request.kind {
            ContactKind::Phone => vec![
                to_international(request.claimed, request.dialing_prefix),
                request.claimed.trim().to_string(),
                primary_value.to_string(),
            ],
            ContactKind::Email => vec![
                normalize_email(request.claimed),
                request.claimed.trim().to_string(),
                primary_value.to_string(),
            ],
        };
        destinations.sort();
        destinations.dedup();
        destinations
    }
}
