//! Verification request workflow: submission upsert and admin review.
//!
//! Every write locks the request row, applies the change to a
//! [`ReviewSnapshot`], re-derives `is_verified` and writes the snapshot back
//! inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    BusinessProfile, BusinessVerification, DriverProfile, DriverVerification,
};
use crate::database::repository::contact::{upsert_verified, PgContactStore};
use crate::database::repository::{business, driver, review, user, ListFilter};
use crate::database::scope::CountryScope;
use crate::services::clock::{Clock, SystemClock};
use crate::services::contact_resolver::{ContactResolver, ContactVerification, ResolveRequest};
use crate::services::document_review::{
    DocumentState, DocumentType, ReviewSnapshot, VerificationKind,
};
use crate::services::phone::same_contact;
use crate::services::VerificationError;
use crate::types::{ContactKind, ReviewStatus};

/// Storage for one kind of verification request
#[async_trait]
pub trait VerificationRecord: Serialize + Send + Sync + Sized + 'static {
    type Profile: Send + Sync;

    const KIND: VerificationKind;

    async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        profile: &Self::Profile,
        documents: &[DocumentState],
        phone_verified: bool,
        email_verified: bool,
        now: DateTime<Utc>,
    ) -> Result<i64, DatabaseError>;

    async fn update_profile(
        conn: &mut PgConnection,
        id: i64,
        profile: &Self::Profile,
        documents: &[DocumentState],
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    async fn fetch(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, DatabaseError>;

    async fn find(pool: &PgPool, id: i64) -> Result<Option<Self>, DatabaseError>;

    async fn find_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, DatabaseError>;

    async fn list(pool: &PgPool, filter: &ListFilter) -> Result<(Vec<Self>, i64), DatabaseError>;

    fn country(&self) -> &str;

    /// `(phone_verified, email_verified)`
    fn contact_flags(&self) -> (bool, bool);
}

#[async_trait]
impl VerificationRecord for BusinessVerification {
    type Profile = BusinessProfile;

    const KIND: VerificationKind = VerificationKind::Business;

    async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        profile: &BusinessProfile,
        documents: &[DocumentState],
        phone_verified: bool,
        email_verified: bool,
        now: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        business::insert(
            conn,
            user_id,
            profile,
            documents,
            phone_verified,
            email_verified,
            now,
        )
        .await
    }

    async fn update_profile(
        conn: &mut PgConnection,
        id: i64,
        profile: &BusinessProfile,
        documents: &[DocumentState],
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        business::update_profile(conn, id, profile, documents, now).await
    }

    async fn fetch(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, DatabaseError> {
        business::find_by_id(conn, id).await
    }

    async fn find(pool: &PgPool, id: i64) -> Result<Option<Self>, DatabaseError> {
        business::find_by_id(pool, id).await
    }

    async fn find_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, DatabaseError> {
        business::find_by_user(pool, user_id).await
    }

    async fn list(pool: &PgPool, filter: &ListFilter) -> Result<(Vec<Self>, i64), DatabaseError> {
        business::list(pool, filter).await
    }

    fn country(&self) -> &str {
        &self.country
    }

    fn contact_flags(&self) -> (bool, bool) {
        (self.phone_verified, self.email_verified)
    }
}

#[async_trait]
impl VerificationRecord for DriverVerification {
    type Profile = DriverProfile;

    const KIND: VerificationKind = VerificationKind::Driver;

    async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        profile: &DriverProfile,
        documents: &[DocumentState],
        phone_verified: bool,
        email_verified: bool,
        now: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        driver::insert(conn, user_id, profile, documents, phone_verified, email_verified, now).await
    }

    async fn update_profile(
        conn: &mut PgConnection,
        id: i64,
        profile: &DriverProfile,
        documents: &[DocumentState],
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        driver::update_profile(conn, id, profile, documents, now).await
    }

    async fn fetch(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, DatabaseError> {
        driver::find_by_id(conn, id).await
    }

    async fn find(pool: &PgPool, id: i64) -> Result<Option<Self>, DatabaseError> {
        driver::find_by_id(pool, id).await
    }

    async fn find_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, DatabaseError> {
        driver::find_by_user(pool, user_id).await
    }

    async fn list(pool: &PgPool, filter: &ListFilter) -> Result<(Vec<Self>, i64), DatabaseError> {
        driver::list(pool, filter).await
    }

    fn country(&self) -> &str {
        &self.country
    }

    fn contact_flags(&self) -> (bool, bool) {
        (self.phone_verified, self.email_verified)
    }
}

/// A validated submission
#[derive(Debug, Clone)]
pub struct Submission<P> {
    pub profile: P,
    pub country: String,
    pub phone: String,
    pub email: Option<String>,
    pub dialing_prefix: String,
    pub documents: Vec<(DocumentType, Option<String>)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactReport {
    pub phone: ContactVerification,
    pub email: ContactVerification,
}

#[derive(Debug, Clone, Serialize)]
pub struct Submitted<R> {
    #[serde(flatten)]
    pub record: R,
    pub verification: ContactReport,
    #[serde(skip)]
    pub created: bool,
}

/// Admin change to the aggregate status
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: ReviewStatus,
    pub notes: Option<String>,
    pub phone_verified: Option<bool>,
    pub email_verified: Option<bool>,
}

#[derive(Clone)]
pub struct VerificationService {
    pool: PgPool,
    resolver: Arc<ContactResolver<PgContactStore>>,
    clock: Arc<dyn Clock>,
}

impl VerificationService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            resolver: Arc::new(ContactResolver::new(PgContactStore::new(pool.clone()))),
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run the resolver for both channels without touching any request row
    pub async fn check_contacts(
        &self,
        user_id: Uuid,
        phone: Option<&str>,
        email: Option<&str>,
        dialing_prefix: &str,
        allow_backfill: bool,
    ) -> ContactReport {
        let phone = match phone.map(str::trim).filter(|p| !p.is_empty()) {
            Some(claimed) => {
                self.resolver
                    .resolve(ResolveRequest {
                        user_id,
                        kind: ContactKind::Phone,
                        claimed,
                        dialing_prefix,
                        allow_backfill,
                    })
                    .await
            }
            None => ContactVerification::manual(false),
        };

        let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(claimed) => {
                self.resolver
                    .resolve(ResolveRequest {
                        user_id,
                        kind: ContactKind::Email,
                        claimed,
                        dialing_prefix,
                        allow_backfill,
                    })
                    .await
            }
            None => ContactVerification::manual(false),
        };

        ContactReport { phone, email }
    }

    /// Create or update the caller's request. One row per user and kind.
    pub async fn submit<R: VerificationRecord>(
        &self,
        user_id: Uuid,
        submission: Submission<R::Profile>,
    ) -> Result<Submitted<R>, VerificationError> {
        let report = self
            .check_contacts(
                user_id,
                Some(submission.phone.as_str()),
                submission.email.as_deref(),
                &submission.dialing_prefix,
                true,
            )
            .await;

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let existing = review::lock_by_user(&mut tx, R::KIND, user_id).await?;

        let documents: Vec<DocumentState> = R::KIND
            .documents()
            .iter()
            .map(|document| {
                let url = submission
                    .documents
                    .iter()
                    .find(|(d, _)| d == document)
                    .and_then(|(_, url)| url.clone());
                let previous = existing.as_ref().and_then(|s| s.document(*document));
                DocumentState::resubmitted(previous, *document, url)
            })
            .collect();

        let (id, created, is_verified, approved_at) = match &existing {
            Some(snapshot) => {
                R::update_profile(&mut tx, snapshot.id, &submission.profile, &documents, now)
                    .await?;
                (snapshot.id, false, snapshot.is_verified, snapshot.approved_at)
            }
            None => {
                let id = R::insert(
                    &mut tx,
                    user_id,
                    &submission.profile,
                    &documents,
                    report.phone.verified,
                    report.email.verified,
                    now,
                )
                .await?;
                (id, true, false, None)
            }
        };

        let mut snapshot = ReviewSnapshot {
            id,
            user_id,
            kind: R::KIND,
            country: submission.country.clone(),
            status: ReviewStatus::Pending,
            phone_verified: report.phone.verified,
            email_verified: report.email.verified,
            is_verified,
            approved_at,
            documents,
        };
        snapshot.recompute(now);
        review::save(&mut tx, &snapshot, None, None, now).await?;

        let record = R::fetch(&mut tx, id).await?.ok_or(VerificationError::NotFound)?;
        tx.commit().await?;

        tracing::info!(
            "{} {} for user {} ({})",
            R::KIND.label(),
            if created { "submitted" } else { "resubmitted" },
            user_id,
            submission.country
        );

        Ok(Submitted {
            record,
            verification: report,
            created,
        })
    }

    async fn locked_in_scope(
        conn: &mut PgConnection,
        kind: VerificationKind,
        id: i64,
        scope: &CountryScope,
    ) -> Result<ReviewSnapshot, VerificationError> {
        let snapshot = review::lock(conn, kind, id)
            .await?
            .ok_or(VerificationError::NotFound)?;
        if !scope.allows(&snapshot.country) {
            return Err(VerificationError::OutOfScope(snapshot.country));
        }
        Ok(snapshot)
    }

    /// Best effort: the review itself has already committed
    async fn grant_role(&self, snapshot: &ReviewSnapshot) {
        let role = snapshot.kind.granted_role();
        let result = match self.pool.acquire().await {
            Ok(mut conn) => user::grant_role(&mut conn, snapshot.user_id, role).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(true) => tracing::info!("Granted role {} to user {}", role, snapshot.user_id),
            Ok(false) => {}
            Err(e) => tracing::error!(
                "Failed to grant role {} to user {}: {}",
                role,
                snapshot.user_id,
                e
            ),
        }
    }

    /// Set the aggregate status, optionally recording manual contact checks
    pub async fn set_status(
        &self,
        kind: VerificationKind,
        id: i64,
        scope: &CountryScope,
        reviewer: Uuid,
        update: StatusUpdate,
    ) -> Result<ReviewSnapshot, VerificationError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let mut snapshot = Self::locked_in_scope(&mut tx, kind, id, scope).await?;

        snapshot.status = update.status;
        if let Some(verified) = update.phone_verified {
            snapshot.phone_verified = verified;
        }
        if let Some(verified) = update.email_verified {
            snapshot.email_verified = verified;
        }
        let newly_verified = snapshot.recompute(now);

        let notes = update.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
        review::save(&mut tx, &snapshot, Some(reviewer), notes, now).await?;
        tx.commit().await?;

        tracing::info!(
            "{} {} set to {} by {} (is_verified={})",
            kind.label(),
            id,
            snapshot.status,
            reviewer,
            snapshot.is_verified
        );
        if newly_verified {
            self.grant_role(&snapshot).await;
        }
        Ok(snapshot)
    }

    pub async fn set_document_status(
        &self,
        kind: VerificationKind,
        id: i64,
        scope: &CountryScope,
        reviewer: Uuid,
        document: DocumentType,
        status: ReviewStatus,
        rejection_reason: Option<String>,
    ) -> Result<ReviewSnapshot, VerificationError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let mut snapshot = Self::locked_in_scope(&mut tx, kind, id, scope).await?;

        snapshot.set_document_status(document, status, rejection_reason)?;
        let newly_verified = snapshot.recompute(now);
        review::save(&mut tx, &snapshot, Some(reviewer), None, now).await?;
        tx.commit().await?;

        tracing::info!(
            "{} {} document {} set to {} by {}",
            kind.label(),
            id,
            document,
            status,
            reviewer
        );
        if newly_verified {
            self.grant_role(&snapshot).await;
        }
        Ok(snapshot)
    }

    /// Record a contact proven by a one-time code inside a verification flow.
    ///
    /// The request's flag only flips when `value` is the contact submitted with
    /// the request. Returns the request when the user has one.
    pub async fn record_verified_contact(
        &self,
        kind: VerificationKind,
        user_id: Uuid,
        contact: ContactKind,
        value: &str,
        dialing_prefix: &str,
    ) -> Result<Option<ReviewSnapshot>, VerificationError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        upsert_verified(&mut tx, user_id, contact, value, kind.contact_purpose(), now).await?;

        let Some(mut snapshot) = review::lock_by_user(&mut tx, kind, user_id).await? else {
            tx.commit().await?;
            return Ok(None);
        };

        let claimed = review::claimed_contact(&mut tx, kind, snapshot.id, contact).await?;
        let matches = claimed
            .as_deref()
            .is_some_and(|claimed| same_contact(contact, claimed, value, dialing_prefix));
        if !matches {
            tx.commit().await?;
            tracing::info!(
                "{} {}: verified {} {} is not the submitted contact",
                kind.label(),
                snapshot.id,
                contact.as_str(),
                value
            );
            return Ok(Some(snapshot));
        }

        match contact {
            ContactKind::Phone => snapshot.phone_verified = true,
            ContactKind::Email => snapshot.email_verified = true,
        }
        let newly_verified = snapshot.recompute(now);
        review::save(&mut tx, &snapshot, None, None, now).await?;
        tx.commit().await?;

        if newly_verified {
            self.grant_role(&snapshot).await;
        }
        Ok(Some(snapshot))
    }

    pub async fn delete(
        &self,
        kind: VerificationKind,
        id: i64,
        scope: &CountryScope,
    ) -> Result<(), VerificationError> {
        let country = review::country_of(&self.pool, kind, id)
            .await?
            .ok_or(VerificationError::NotFound)?;
        if !scope.allows(&country) {
            return Err(VerificationError::OutOfScope(country));
        }

        if !review::delete(&self.pool, kind, id).await? {
            return Err(VerificationError::NotFound);
        }
        tracing::info!("Deleted {} {}", kind.label(), id);
        Ok(())
    }
}
