use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::services::document_review::{DocumentState, ReviewSnapshot, VerificationKind};
use crate::types::{ContactKind, ReviewStatus};

fn snapshot_columns(kind: VerificationKind) -> String {
    let mut columns = vec![
        "id".to_string(),
        "user_id".to_string(),
        "country".to_string(),
        "status".to_string(),
        "phone_verified".to_string(),
        "email_verified".to_string(),
        "is_verified".to_string(),
        "approved_at".to_string(),
    ];
    for document in kind.documents() {
        let prefix = document.column_prefix();
        columns.push(format!("{prefix}_url"));
        columns.push(format!("{prefix}_status"));
        columns.push(format!("{prefix}_rejection_reason"));
    }
    columns.join(", ")
}

fn parse_status(raw: &str) -> Result<ReviewStatus, sqlx::Error> {
    raw.parse::<ReviewStatus>()
        .map_err(|e| sqlx::Error::Decode(e.into()))
}

fn snapshot_from_row(kind: VerificationKind, row: &PgRow) -> Result<ReviewSnapshot, sqlx::Error> {
    let mut documents = Vec::with_capacity(kind.documents().len());
    for document in kind.documents() {
        let prefix = document.column_prefix();
        let status: Option<String> = row.try_get(format!("{prefix}_status").as_str())?;
        documents.push(DocumentState {
            document: *document,
            url: row.try_get(format!("{prefix}_url").as_str())?,
            status: status.as_deref().map(parse_status).transpose()?,
            rejection_reason: row.try_get(format!("{prefix}_rejection_reason").as_str())?,
        });
    }

    let status: String = row.try_get("status")?;
    Ok(ReviewSnapshot {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        kind,
        country: row.try_get("country")?,
        status: parse_status(&status)?,
        phone_verified: row.try_get("phone_verified")?,
        email_verified: row.try_get("email_verified")?,
        is_verified: row.try_get("is_verified")?,
        approved_at: row.try_get("approved_at")?,
        documents,
    })
}

/// Lock a request row for the rest of the transaction
pub async fn lock(
    conn: &mut PgConnection,
    kind: VerificationKind,
    id: i64,
) -> Result<Option<ReviewSnapshot>, DatabaseError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM {} WHERE id = $1 FOR UPDATE",
        snapshot_columns(kind),
        kind.table()
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| snapshot_from_row(kind, &r)).transpose()?)
}

pub async fn lock_by_user(
    conn: &mut PgConnection,
    kind: VerificationKind,
    user_id: Uuid,
) -> Result<Option<ReviewSnapshot>, DatabaseError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM {} WHERE user_id = $1 FOR UPDATE",
        snapshot_columns(kind),
        kind.table()
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| snapshot_from_row(kind, &r)).transpose()?)
}

/// Write back the review state held in `snapshot`.
///
/// Document URLs are left alone; only statuses and reasons are written.
pub async fn save(
    conn: &mut PgConnection,
    snapshot: &ReviewSnapshot,
    reviewed_by: Option<Uuid>,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "UPDATE {} SET status = ",
        snapshot.kind.table()
    ));
    query
        .push_bind(snapshot.status.as_str())
        .push(", phone_verified = ")
        .push_bind(snapshot.phone_verified)
        .push(", email_verified = ")
        .push_bind(snapshot.email_verified)
        .push(", is_verified = ")
        .push_bind(snapshot.is_verified)
        .push(", approved_at = ")
        .push_bind(snapshot.approved_at)
        .push(", updated_at = ")
        .push_bind(now);

    if let Some(reviewer) = reviewed_by {
        query
            .push(", reviewed_by = ")
            .push_bind(reviewer)
            .push(", reviewed_date = ")
            .push_bind(now);
    }

    if let Some(notes) = notes {
        query.push(", notes = ").push_bind(notes);
    }

    for document in &snapshot.documents {
        let prefix = document.document.column_prefix();
        query
            .push(format!(", {prefix}_status = "))
            .push_bind(document.status.map(|s| s.as_str()))
            .push(format!(", {prefix}_rejection_reason = "))
            .push_bind(document.rejection_reason.as_deref());
    }

    query.push(" WHERE id = ").push_bind(snapshot.id);

    let result = query.build().execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!(
            "{} {}",
            snapshot.kind.label(),
            snapshot.id
        )));
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, kind: VerificationKind, id: i64) -> Result<bool, DatabaseError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Contact submitted with a request, read inside the caller's transaction
pub async fn claimed_contact(
    conn: &mut PgConnection,
    kind: VerificationKind,
    id: i64,
    contact: ContactKind,
) -> Result<Option<String>, DatabaseError> {
    let row: Option<(Option<String>,)> = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE id = $1",
        kind.contact_column(contact),
        kind.table()
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.and_then(|(value,)| value))
}

/// Country of a request, for scope checks before locking
pub async fn country_of(
    pool: &PgPool,
    kind: VerificationKind,
    id: i64,
) -> Result<Option<String>, DatabaseError> {
    let row: Option<(String,)> =
        sqlx::query_as(&format!("SELECT country FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(country,)| country))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_columns_cover_every_document() {
        let columns = snapshot_columns(VerificationKind::Driver);
        assert!(columns.starts_with("id, user_id, country, status"));
        assert!(columns
            .contains("billing_proof_url, billing_proof_status, billing_proof_rejection_reason"));
        assert_eq!(columns.matches("_rejection_reason").count(), 8);

        let columns = snapshot_columns(VerificationKind::Business);
        assert_eq!(columns.matches("_status").count(), 4);
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        assert!(matches!(parse_status("archived"), Err(sqlx::Error::Decode(_))));
        assert_eq!(parse_status("approved").unwrap(), ReviewStatus::Approved);
    }
}
