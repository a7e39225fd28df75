use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::types::ContactKind;

/// `(contact column, verified flag column)` on the users table
pub(crate) fn primary_columns(kind: ContactKind) -> (&'static str, &'static str) {
    match kind {
        ContactKind::Phone => ("phone", "phone_verified"),
        ContactKind::Email => ("email", "email_verified"),
    }
}

/// Fill the primary contact only while it is still empty
pub async fn fill_missing_primary(
    pool: &PgPool,
    user_id: Uuid,
    kind: ContactKind,
    value: &str,
) -> Result<(), DatabaseError> {
    let (column, _) = primary_columns(kind);
    sqlx::query(&format!(
        "UPDATE users SET {column} = $2, updated_at = NOW() \
         WHERE id = $1 AND ({column} IS NULL OR {column} = '')"
    ))
    .bind(user_id)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_primary_verified(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: ContactKind,
) -> Result<(), DatabaseError> {
    let (_, flag) = primary_columns(kind);
    sqlx::query(&format!(
        "UPDATE users SET {} = TRUE, updated_at = NOW() WHERE id = $1",
        flag
    ))
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Add `role` to `users.roles` unless already present
pub async fn grant_role(
    conn: &mut PgConnection,
    user_id: Uuid,
    role: &str,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET roles = COALESCE(roles, '[]'::jsonb) || to_jsonb($2::text),
            updated_at = NOW()
        WHERE id = $1 AND NOT (COALESCE(roles, '[]'::jsonb) @> to_jsonb(ARRAY[$2::text]))
        "#,
    )
    .bind(user_id)
    .bind(role)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
