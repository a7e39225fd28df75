//! In-memory stores and a controllable clock for service-level tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::database::models::{NewOtpChallenge, OtpChallenge};
use crate::database::DatabaseError;
use crate::services::clock::Clock;
use crate::services::contact_resolver::{ContactStore, PrimaryContact};
use crate::services::otp::{ConsumeOutcome, OtpStore};
use crate::types::ContactKind;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn injected_failure() -> DatabaseError {
    DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[derive(Debug, Default)]
struct ContactState {
    primaries: HashMap<(Uuid, ContactKind), PrimaryContact>,
    professional: Vec<(Uuid, ContactKind, String, bool)>,
    verified_otps: Vec<(ContactKind, String)>,
}

/// [`ContactStore`] over plain collections; clones share state
#[derive(Debug, Clone, Default)]
pub struct MemoryContactStore {
    state: Arc<Mutex<ContactState>>,
    fail_next: Arc<AtomicBool>,
}

impl MemoryContactStore {
    /// A `users` row with the given primary contacts
    pub fn add_user(
        &self,
        phone: Option<&str>,
        phone_verified: bool,
        email: Option<&str>,
        email_verified: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.state.lock().unwrap();
        state.primaries.insert(
            (id, ContactKind::Phone),
            PrimaryContact {
                value: phone.map(str::to_string),
                verified: phone_verified,
            },
        );
        state.primaries.insert(
            (id, ContactKind::Email),
            PrimaryContact {
                value: email.map(str::to_string),
                verified: email_verified,
            },
        );
        id
    }

    pub fn add_professional(&self, user_id: Uuid, kind: ContactKind, value: &str, verified: bool) {
        self.state
            .lock()
            .unwrap()
            .professional
            .push((user_id, kind, value.to_string(), verified));
    }

    pub fn add_verified_otp(&self, kind: ContactKind, destination: &str) {
        self.state
            .lock()
            .unwrap()
            .verified_otps
            .push((kind, destination.to_string()));
    }

    pub fn primary(&self, user_id: Uuid, kind: ContactKind) -> PrimaryContact {
        self.state
            .lock()
            .unwrap()
            .primaries
            .get(&(user_id, kind))
            .cloned()
            .unwrap_or(PrimaryContact {
                value: None,
                verified: false,
            })
    }

    /// The next store call returns an error
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DatabaseError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(injected_failure())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn verified_contacts(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<Vec<String>, DatabaseError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .professional
            .iter()
            .filter(|(user, k, _, verified)| *user == user_id && *k == kind && *verified)
            .map(|(_, _, value, _)| value.clone())
            .collect())
    }

    async fn primary_contact(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<Option<PrimaryContact>, DatabaseError> {
        self.check()?;
        Ok(self.state.lock().unwrap().primaries.get(&(user_id, kind)).cloned())
    }

    async fn backfill_primary(
        &self,
        user_id: Uuid,
        kind: ContactKind,
        value: &str,
    ) -> Result<(), DatabaseError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if let Some(primary) = state.primaries.get_mut(&(user_id, kind)) {
            if primary.value.is_none() {
                primary.value = Some(value.to_string());
            }
        }
        Ok(())
    }

    async fn mark_primary_verified(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<(), DatabaseError> {
        self.check()?;
        if let Some(primary) = self.state.lock().unwrap().primaries.get_mut(&(user_id, kind)) {
            primary.verified = true;
        }
        Ok(())
    }

    async fn has_verified_otp(
        &self,
        kind: ContactKind,
        destinations: &[String],
    ) -> Result<bool, DatabaseError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .verified_otps
            .iter()
            .any(|(k, dest)| *k == kind && destinations.contains(dest)))
    }
}

#[derive(Debug, Default)]
struct OtpState {
    challenges: Vec<(ContactKind, OtpChallenge)>,
    deliveries: Vec<(String, String, bool)>,
}

/// [`OtpStore`] over plain collections; clones share state
#[derive(Debug, Clone, Default)]
pub struct MemoryOtpStore {
    state: Arc<Mutex<OtpState>>,
    next_id: Arc<AtomicI64>,
    exhaust_next: Arc<AtomicBool>,
}

impl MemoryOtpStore {
    /// Use up the attempts of the next challenge just before it is consumed,
    /// as a concurrent wrong guess would
    pub fn exhaust_before_next_consume(&self) {
        self.exhaust_next.store(true, Ordering::SeqCst);
    }

    /// Every stored challenge of `kind`, oldest first
    pub fn challenges(&self, kind: ContactKind) -> Vec<OtpChallenge> {
        self.state
            .lock()
            .unwrap()
            .challenges
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// `(country, provider, success)` per recorded SMS
    pub fn deliveries(&self) -> Vec<(String, String, bool)> {
        self.state.lock().unwrap().deliveries.clone()
    }

    /// An unexpired challenge that bypasses the send path
    pub fn add_outstanding(&self, kind: ContactKind, destination: &str, code: &str) {
        let now = FixedClock::default().now();
        let challenge = OtpChallenge {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            otp_id: format!("manual_{}", Uuid::new_v4().simple()),
            destination: destination.to_string(),
            otp: code.to_string(),
            country_code: None,
            purpose: None,
            expires_at: now + Duration::days(365),
            attempts: 0,
            max_attempts: 3,
            verified: false,
            verified_at: None,
            provider_used: None,
            created_at: now,
        };
        self.state.lock().unwrap().challenges.push((kind, challenge));
    }

    fn newest_first(
        &self,
        kind: ContactKind,
        keep: impl Fn(&OtpChallenge) -> bool,
    ) -> Vec<OtpChallenge> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<OtpChallenge> = state
            .challenges
            .iter()
            .filter(|(k, c)| *k == kind && keep(c))
            .map(|(_, c)| c.clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn count_since(
        &self,
        kind: ContactKind,
        destination: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .challenges
            .iter()
            .filter(|(k, c)| *k == kind && c.destination == destination && c.created_at >= since)
            .count() as i64)
    }

    async fn expire_outstanding(
        &self,
        kind: ContactKind,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        let mut expired = 0;
        for (k, challenge) in state.challenges.iter_mut() {
            if *k == kind && challenge.destination == destination && challenge.is_outstanding(now) {
                challenge.expires_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn insert(
        &self,
        kind: ContactKind,
        challenge: &NewOtpChallenge,
    ) -> Result<OtpChallenge, DatabaseError> {
        let stored = OtpChallenge {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            otp_id: challenge.otp_id.clone(),
            destination: challenge.destination.clone(),
            otp: challenge.otp.clone(),
            country_code: challenge.country_code.clone(),
            purpose: challenge.purpose.clone(),
            expires_at: challenge.expires_at,
            attempts: 0,
            max_attempts: challenge.max_attempts,
            verified: false,
            verified_at: None,
            provider_used: Some(challenge.provider_used.clone()),
            created_at: challenge.created_at,
        };
        self.state
            .lock()
            .unwrap()
            .challenges
            .push((kind, stored.clone()));
        Ok(stored)
    }

    async fn find_matching(
        &self,
        kind: ContactKind,
        destination: &str,
        code: &str,
        otp_id: Option<&str>,
    ) -> Result<Vec<OtpChallenge>, DatabaseError> {
        Ok(self.newest_first(kind, |c| {
            c.destination == destination
                && c.otp == code
                && otp_id.map_or(true, |id| c.otp_id == id)
        }))
    }

    async fn outstanding(
        &self,
        kind: ContactKind,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<OtpChallenge>, DatabaseError> {
        Ok(self.newest_first(kind, |c| {
            c.destination == destination && c.is_outstanding(now)
        }))
    }

    async fn increment_attempts(
        &self,
        kind: ContactKind,
        ids: &[i64],
    ) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().unwrap();
        for (k, challenge) in state.challenges.iter_mut() {
            if *k == kind && ids.contains(&challenge.id) {
                challenge.attempts += 1;
            }
        }
        Ok(())
    }

    async fn mark_verified(
        &self,
        kind: ContactKind,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, DatabaseError> {
        let exhaust = self.exhaust_next.swap(false, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let challenge = state
            .challenges
            .iter_mut()
            .find(|(k, c)| *k == kind && c.id == id)
            .map(|(_, c)| c);

        let Some(c) = challenge else {
            return Ok(ConsumeOutcome::AlreadyVerified);
        };
        if exhaust {
            c.attempts = c.max_attempts;
        }
        Ok(if c.verified {
            ConsumeOutcome::AlreadyVerified
        } else if c.is_exhausted() {
            ConsumeOutcome::Exhausted
        } else {
            c.verified = true;
            c.verified_at = Some(now);
            ConsumeOutcome::Verified
        })
    }

    async fn record_sms_delivery(
        &self,
        country_code: &str,
        provider: &str,
        _cost: f64,
        success: bool,
    ) -> Result<(), DatabaseError> {
        self.state.lock().unwrap().deliveries.push((
            country_code.to_string(),
            provider.to_string(),
            success,
        ));
        Ok(())
    }
}
