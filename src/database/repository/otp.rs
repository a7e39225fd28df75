use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::contact::otp_table;
use super::sms_config;
use crate::database::manager::DatabaseError;
use crate::database::models::{NewOtpChallenge, OtpChallenge};
use crate::services::otp::{ConsumeOutcome, OtpStore};
use crate::types::ContactKind;

fn select_columns(column: &str) -> String {
    format!(
        "id, otp_id, {column} AS destination, otp, country_code, purpose, expires_at, \
         attempts, max_attempts, verified, verified_at, provider_used, created_at"
    )
}

/// Challenges in `phone_otp_verifications` / `email_otp_verifications`
#[derive(Clone)]
pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn count_since(
        &self,
        kind: ContactKind,
        destination: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let (table, column) = otp_table(kind);
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM {table} WHERE {column} = $1 AND created_at >= $2"
        ))
        .bind(destination)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn expire_outstanding(
        &self,
        kind: ContactKind,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let (table, column) = otp_table(kind);
        let result = sqlx::query(&format!(
            "UPDATE {table} SET expires_at = $2 \
             WHERE {column} = $1 AND verified = FALSE AND expires_at > $2"
        ))
        .bind(destination)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert(
        &self,
        kind: ContactKind,
        challenge: &NewOtpChallenge,
    ) -> Result<OtpChallenge, DatabaseError> {
        let (table, column) = otp_table(kind);
        let stored = sqlx::query_as::<_, OtpChallenge>(&format!(
            r#"
            INSERT INTO {table}
                (otp_id, {column}, otp, country_code, purpose, expires_at,
                 attempts, max_attempts, verified, provider_used, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 0, $7, FALSE, $8, $9)
            RETURNING {}
            "#,
            select_columns(column)
        ))
        .bind(&challenge.otp_id)
        .bind(&challenge.destination)
        .bind(&challenge.otp)
        .bind(&challenge.country_code)
        .bind(&challenge.purpose)
        .bind(challenge.expires_at)
        .bind(challenge.max_attempts)
        .bind(&challenge.provider_used)
        .bind(challenge.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn find_matching(
        &self,
        kind: ContactKind,
        destination: &str,
        code: &str,
        otp_id: Option<&str>,
    ) -> Result<Vec<OtpChallenge>, DatabaseError> {
        let (table, column) = otp_table(kind);
        let rows = sqlx::query_as::<_, OtpChallenge>(&format!(
            r#"
            SELECT {}
            FROM {table}
            WHERE {column} = $1 AND otp = $2 AND ($3::text IS NULL OR otp_id = $3)
            ORDER BY created_at DESC
            "#,
            select_columns(column)
        ))
        .bind(destination)
        .bind(code)
        .bind(otp_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn outstanding(
        &self,
        kind: ContactKind,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<OtpChallenge>, DatabaseError> {
        let (table, column) = otp_table(kind);
        let rows = sqlx::query_as::<_, OtpChallenge>(&format!(
            r#"
            SELECT {}
            FROM {table}
            WHERE {column} = $1 AND verified = FALSE AND expires_at > $2
            ORDER BY created_at DESC
            "#,
            select_columns(column)
        ))
        .bind(destination)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn increment_attempts(
        &self,
        kind: ContactKind,
        ids: &[i64],
    ) -> Result<(), DatabaseError> {
        if ids.is_empty() {
            return Ok(());
        }
        let (table, _) = otp_table(kind);
        sqlx::query(&format!(
            "UPDATE {table} SET attempts = attempts + 1 WHERE id = ANY($1)"
        ))
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_verified(
        &self,
        kind: ContactKind,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, DatabaseError> {
        let (table, _) = otp_table(kind);
        let result = sqlx::query(&format!(
            "UPDATE {table} SET verified = TRUE, verified_at = $2 \
             WHERE id = $1 AND verified = FALSE AND attempts < max_attempts"
        ))
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 1 {
            return Ok(ConsumeOutcome::Verified);
        }

        let verified: Option<bool> =
            sqlx::query_scalar(&format!("SELECT verified FROM {table} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(match verified {
            Some(false) => ConsumeOutcome::Exhausted,
            _ => ConsumeOutcome::AlreadyVerified,
        })
    }

    async fn record_sms_delivery(
        &self,
        country_code: &str,
        provider: &str,
        cost: f64,
        success: bool,
    ) -> Result<(), DatabaseError> {
        sms_config::record_delivery(&self.pool, country_code, provider, cost, success).await
    }
}
