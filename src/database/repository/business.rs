use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::ListFilter;
use crate::database::manager::DatabaseError;
use crate::database::models::{BusinessProfile, BusinessVerification};
use crate::services::document_review::DocumentState;

const TABLE: &str = "business_verifications";
const SEARCH_COLUMNS: &[&str] = &["business_name", "business_email", "business_phone"];

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<BusinessVerification>, DatabaseError> {
    let row = sqlx::query_as::<_, BusinessVerification>(&format!(
        "SELECT * FROM {TABLE} WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

pub async fn find_by_user<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<BusinessVerification>, DatabaseError> {
    let row = sqlx::query_as::<_, BusinessVerification>(&format!(
        "SELECT * FROM {TABLE} WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// First submission; a concurrent first submission surfaces as `Conflict`
pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    profile: &BusinessProfile,
    documents: &[DocumentState],
    phone_verified: bool,
    email_verified: bool,
    now: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO {TABLE} (user_id, business_name, business_email, business_phone, \
         business_address, business_category, business_description, license_number, tax_id, \
         country, country_name, status, phone_verified, email_verified, is_verified, \
         submitted_at, created_at, updated_at"
    ));
    for document in documents {
        let prefix = document.document.column_prefix();
        query.push(format!(", {prefix}_url, {prefix}_status"));
    }
    query.push(") VALUES (");

    {
        let mut values = query.separated(", ");
        values
            .push_bind(user_id)
            .push_bind(&profile.business_name)
            .push_bind(&profile.business_email)
            .push_bind(&profile.business_phone)
            .push_bind(&profile.business_address)
            .push_bind(&profile.business_category)
            .push_bind(&profile.business_description)
            .push_bind(&profile.license_number)
            .push_bind(&profile.tax_id)
            .push_bind(&profile.country)
            .push_bind(&profile.country_name)
            .push_bind("pending")
            .push_bind(phone_verified)
            .push_bind(email_verified)
            .push_bind(false)
            .push_bind(now)
            .push_bind(now)
            .push_bind(now);
        for document in documents {
            values
                .push_bind(document.url.as_deref())
                .push_bind(document.status.map(|s| s.as_str()));
        }
    }
    query.push(") RETURNING id");

    let (id,): (i64,) = query
        .build_query_as()
        .fetch_one(conn)
        .await
        .map_err(DatabaseError::classify)?;
    Ok(id)
}

/// Resubmission: overwrite profile fields and document URLs in place
pub async fn update_profile(
    conn: &mut PgConnection,
    id: i64,
    profile: &BusinessProfile,
    documents: &[DocumentState],
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let mut query = QueryBuilder::<Postgres>::new(format!("UPDATE {TABLE} SET "));
    {
        let mut set = query.separated(", ");
        set.push("business_name = ").push_bind_unseparated(&profile.business_name);
        set.push("business_email = ").push_bind_unseparated(&profile.business_email);
        set.push("business_phone = ").push_bind_unseparated(&profile.business_phone);
        set.push("business_address = ").push_bind_unseparated(&profile.business_address);
        set.push("business_category = ").push_bind_unseparated(&profile.business_category);
        set.push("business_description = ")
            .push_bind_unseparated(&profile.business_description);
        set.push("license_number = ").push_bind_unseparated(&profile.license_number);
        set.push("tax_id = ").push_bind_unseparated(&profile.tax_id);
        set.push("country = ").push_bind_unseparated(&profile.country);
        set.push("country_name = ").push_bind_unseparated(&profile.country_name);
        set.push("submitted_at = ").push_bind_unseparated(now);
        for document in documents {
            set.push(format!("{}_url = ", document.document.column_prefix()))
                .push_bind_unseparated(document.url.as_deref());
        }
    }
    query.push(" WHERE id = ").push_bind(id);

    query.build().execute(conn).await?;
    Ok(())
}

/// One page of requests plus the total matching count
pub async fn list(
    pool: &PgPool,
    filter: &ListFilter,
) -> Result<(Vec<BusinessVerification>, i64), DatabaseError> {
    let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {TABLE}"));
    filter.push_where(&mut count, SEARCH_COLUMNS);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {TABLE}"));
    filter.push_where(&mut query, SEARCH_COLUMNS);
    query
        .push(" ORDER BY submitted_at DESC, id DESC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);

    let rows = query
        .build_query_as::<BusinessVerification>()
        .fetch_all(pool)
        .await?;
    Ok((rows, total))
}
