use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::ListFilter;
use crate::database::manager::DatabaseError;
use crate::database::models::{DriverProfile, DriverVerification};
use crate::services::document_review::DocumentState;

const TABLE: &str = "driver_verifications";
const SEARCH_COLUMNS: &[&str] = &["full_name", "email", "phone_number", "nic_number"];

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<DriverVerification>, DatabaseError> {
    let row = sqlx::query_as::<_, DriverVerification>(&format!(
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
) -> Result<Option<DriverVerification>, DatabaseError> {
    let row = sqlx::query_as::<_, DriverVerification>(&format!(
        "SELECT * FROM {TABLE} WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

fn push_profile<'a>(
    set: &mut sqlx::query_builder::Separated<'_, 'a, Postgres, &'static str>,
    profile: &'a DriverProfile,
) {
    set.push("first_name = ").push_bind_unseparated(&profile.first_name);
    set.push("last_name = ").push_bind_unseparated(&profile.last_name);
    set.push("full_name = ").push_bind_unseparated(&profile.full_name);
    set.push("date_of_birth = ").push_bind_unseparated(profile.date_of_birth);
    set.push("gender = ").push_bind_unseparated(&profile.gender);
    set.push("nic_number = ").push_bind_unseparated(&profile.nic_number);
    set.push("phone_number = ").push_bind_unseparated(&profile.phone_number);
    set.push("secondary_mobile = ").push_bind_unseparated(&profile.secondary_mobile);
    set.push("email = ").push_bind_unseparated(&profile.email);
    set.push("city_id = ").push_bind_unseparated(&profile.city_id);
    set.push("city_name = ").push_bind_unseparated(&profile.city_name);
    set.push("country = ").push_bind_unseparated(&profile.country);
    set.push("license_number = ").push_bind_unseparated(&profile.license_number);
    set.push("license_expiry = ").push_bind_unseparated(profile.license_expiry);
    set.push("license_has_no_expiry = ")
        .push_bind_unseparated(profile.license_has_no_expiry);
    set.push("vehicle_type_id = ").push_bind_unseparated(&profile.vehicle_type_id);
    set.push("vehicle_type_name = ").push_bind_unseparated(&profile.vehicle_type_name);
    set.push("vehicle_model = ").push_bind_unseparated(&profile.vehicle_model);
    set.push("vehicle_year = ").push_bind_unseparated(profile.vehicle_year);
    set.push("vehicle_number = ").push_bind_unseparated(&profile.vehicle_number);
    set.push("vehicle_color = ").push_bind_unseparated(&profile.vehicle_color);
    set.push("is_vehicle_owner = ").push_bind_unseparated(profile.is_vehicle_owner);
    set.push("insurance_number = ").push_bind_unseparated(&profile.insurance_number);
    set.push("insurance_expiry = ").push_bind_unseparated(profile.insurance_expiry);
    set.push("vehicle_image_urls = ").push_bind_unseparated(&profile.vehicle_image_urls);
    set.push("subscription_plan = ").push_bind_unseparated(&profile.subscription_plan);
}

/// First submission; a concurrent first submission surfaces as `Conflict`.
///
/// Written as INSERT of the user id followed by an in-place update so the
/// profile column list lives in one place.
pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    profile: &DriverProfile,
    documents: &[DocumentState],
    phone_verified: bool,
    email_verified: bool,
    now: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let (id,): (i64,) = sqlx::query_as(&format!(
        "INSERT INTO {TABLE} (user_id, full_name, date_of_birth, gender, nic_number, \
         phone_number, country, status, phone_verified, email_verified, is_verified, \
         submitted_at, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9, FALSE, $10, $10, $10) \
         RETURNING id"
    ))
    .bind(user_id)
    .bind(&profile.full_name)
    .bind(profile.date_of_birth)
    .bind(&profile.gender)
    .bind(&profile.nic_number)
    .bind(&profile.phone_number)
    .bind(&profile.country)
    .bind(phone_verified)
    .bind(email_verified)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(DatabaseError::classify)?;

    update_profile(&mut *conn, id, profile, documents, now).await?;
    Ok(id)
}

/// Overwrite profile fields and document URLs in place
pub async fn update_profile(
    conn: &mut PgConnection,
    id: i64,
    profile: &DriverProfile,
    documents: &[DocumentState],
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let mut query = QueryBuilder::<Postgres>::new(format!("UPDATE {TABLE} SET "));
    {
        let mut set = query.separated(", ");
        push_profile(&mut set, profile);
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

pub async fn list(
    pool: &PgPool,
    filter: &ListFilter,
) -> Result<(Vec<DriverVerification>, i64), DatabaseError> {
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
        .build_query_as::<DriverVerification>()
        .fetch_all(pool)
        .await?;
    Ok((rows, total))
}
