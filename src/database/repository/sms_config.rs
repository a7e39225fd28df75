use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::models::{SmsAnalyticsTotal, SmsProviderConfigRow};

const COLUMNS: &str = "id, country_code, provider, config, is_active, created_at, updated_at";

/// Active rows, newest first, as consumed by the provider registry
pub async fn list_active(pool: &PgPool) -> Result<Vec<SmsProviderConfigRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, SmsProviderConfigRow>(&format!(
        "SELECT {COLUMNS} FROM sms_provider_configs WHERE is_active = TRUE \
         ORDER BY updated_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list(
    pool: &PgPool,
    country: Option<&str>,
) -> Result<Vec<SmsProviderConfigRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, SmsProviderConfigRow>(&format!(
        "SELECT {COLUMNS} FROM sms_provider_configs \
         WHERE ($1::text IS NULL OR country_code = $1) \
         ORDER BY country_code, updated_at DESC"
    ))
    .bind(country)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn for_country(
    pool: &PgPool,
    country: &str,
) -> Result<Option<SmsProviderConfigRow>, DatabaseError> {
    let row = sqlx::query_as::<_, SmsProviderConfigRow>(&format!(
        "SELECT {COLUMNS} FROM sms_provider_configs \
         WHERE country_code = $1 AND is_active = TRUE \
         ORDER BY updated_at DESC, id DESC LIMIT 1"
    ))
    .bind(country)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Store `provider` as the active configuration for `country`
pub async fn upsert(
    conn: &mut PgConnection,
    country: &str,
    provider: &str,
    config: &Value,
    is_active: bool,
) -> Result<SmsProviderConfigRow, DatabaseError> {
    let row = sqlx::query_as::<_, SmsProviderConfigRow>(&format!(
        r#"
        INSERT INTO sms_provider_configs (country_code, provider, config, is_active)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (country_code, provider)
        DO UPDATE SET config = EXCLUDED.config, is_active = EXCLUDED.is_active, updated_at = NOW()
        RETURNING {COLUMNS}
        "#
    ))
    .bind(country)
    .bind(provider)
    .bind(config)
    .bind(is_active)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// A country has at most one active provider
pub async fn deactivate_others(
    conn: &mut PgConnection,
    country: &str,
    keep_provider: &str,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "UPDATE sms_provider_configs SET is_active = FALSE, updated_at = NOW() \
         WHERE country_code = $1 AND provider <> $2 AND is_active = TRUE",
    )
    .bind(country)
    .bind(keep_provider)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_country(pool: &PgPool, country: &str) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM sms_provider_configs WHERE country_code = $1")
        .bind(country)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn analytics(
    pool: &PgPool,
    country: Option<&str>,
) -> Result<Vec<SmsAnalyticsTotal>, DatabaseError> {
    let rows = sqlx::query_as::<_, SmsAnalyticsTotal>(
        r#"
        SELECT country_code,
               provider,
               COUNT(*) AS messages,
               COUNT(*) FILTER (WHERE NOT success) AS failures,
               COALESCE(SUM(cost), 0)::float8 AS total_cost,
               MAX(created_at) AS last_sent_at
        FROM sms_analytics
        WHERE ($1::text IS NULL OR country_code = $1)
        GROUP BY country_code, provider
        ORDER BY country_code, provider
        "#,
    )
    .bind(country)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn record_delivery(
    pool: &PgPool,
    country: &str,
    provider: &str,
    cost: f64,
    success: bool,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO sms_analytics (country_code, provider, cost, success) VALUES ($1, $2, $3, $4)",
    )
    .bind(country)
    .bind(provider)
    .bind(cost)
    .bind(success)
    .execute(pool)
    .await?;
    Ok(())
}
