use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::user::{fill_missing_primary, primary_columns, set_primary_verified};
use crate::database::manager::DatabaseError;
use crate::services::contact_resolver::{ContactStore, PrimaryContact};
use crate::types::ContactKind;

/// `(table, contact column)` for professional contacts
fn contact_table(kind: ContactKind) -> (&'static str, &'static str) {
    match kind {
        ContactKind::Phone => ("user_phone_numbers", "phone_number"),
        ContactKind::Email => ("user_email_addresses", "email_address"),
    }
}

pub(crate) fn otp_table(kind: ContactKind) -> (&'static str, &'static str) {
    match kind {
        ContactKind::Phone => ("phone_otp_verifications", "phone"),
        ContactKind::Email => ("email_otp_verifications", "email"),
    }
}

/// Record a contact proven by a one-time code
pub async fn upsert_verified(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: ContactKind,
    value: &str,
    purpose: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let (table, column) = contact_table(kind);
    sqlx::query(&format!(
        r#"
        INSERT INTO {table} (user_id, {column}, purpose, is_verified, verified_at)
        VALUES ($1, $2, $3, TRUE, $4)
        ON CONFLICT (user_id, {column}, purpose)
        DO UPDATE SET is_verified = TRUE, verified_at = EXCLUDED.verified_at
        "#
    ))
    .bind(user_id)
    .bind(value)
    .bind(purpose)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Postgres-backed sources for the contact resolver
#[derive(Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn verified_contacts(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<Vec<String>, DatabaseError> {
        let (table, column) = contact_table(kind);
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT {column} FROM {table} WHERE user_id = $1 AND is_verified = TRUE"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(value,)| value).collect())
    }

    async fn primary_contact(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<Option<PrimaryContact>, DatabaseError> {
        let (column, flag) = primary_columns(kind);
        let row: Option<(Option<String>, bool)> = sqlx::query_as(&format!(
            "SELECT {column}, {flag} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(value, verified)| PrimaryContact { value, verified }))
    }

    async fn backfill_primary(
        &self,
        user_id: Uuid,
        kind: ContactKind,
        value: &str,
    ) -> Result<(), DatabaseError> {
        fill_missing_primary(&self.pool, user_id, kind, value).await
    }

    async fn mark_primary_verified(
        &self,
        user_id: Uuid,
        kind: ContactKind,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        set_primary_verified(&mut *conn, user_id, kind).await
    }

    async fn has_verified_otp(
        &self,
        kind: ContactKind,
        destinations: &[String],
    ) -> Result<bool, DatabaseError> {
        let (table, column) = otp_table(kind);
        let (found,): (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE {column} = ANY($1) AND verified = TRUE)"
        ))
        .bind(destinations)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }
}
