use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::Country;

const COLUMNS: &str = "id, code, name, phone_prefix, is_active";

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Country>, DatabaseError> {
    let country = sqlx::query_as::<_, Country>(&format!(
        "SELECT {} FROM countries WHERE UPPER(code) = UPPER($1)",
        COLUMNS
    ))
    .bind(code)
    .fetch_optional(pool)
    .await?;
    Ok(country)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Country>, DatabaseError> {
    let country =
        sqlx::query_as::<_, Country>(&format!("SELECT {} FROM countries WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(country)
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<Country>, DatabaseError> {
    let countries = sqlx::query_as::<_, Country>(&format!(
        "SELECT {} FROM countries WHERE is_active = TRUE ORDER BY code",
        COLUMNS
    ))
    .fetch_all(pool)
    .await?;
    Ok(countries)
}
