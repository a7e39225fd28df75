pub mod business;
pub mod contact;
pub mod country;
pub mod driver;
pub mod otp;
pub mod review;
pub mod sms_config;
pub mod user;

use crate::database::scope::CountryScope;
use crate::types::ReviewStatus;

/// Filters for admin list endpoints
#[derive(Debug, Clone)]
pub struct ListFilter {
    pub scope: CountryScope,
    pub status: Option<ReviewStatus>,
    /// Case-insensitive match on name, email or phone
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ListFilter {
    /// Append ` WHERE …` for this filter; `search_columns` are matched with ILIKE
    pub(crate) fn push_where<'a>(
        &'a self,
        query: &mut sqlx::QueryBuilder<'a, sqlx::Postgres>,
        search_columns: &[&str],
    ) {
        query.push(" WHERE TRUE");

        if let Some(country) = self.scope.country() {
            query.push(" AND UPPER(country) = ").push_bind(country);
        }

        if let Some(status) = self.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            query.push(" AND (");
            for (i, column) in search_columns.iter().enumerate() {
                if i > 0 {
                    query.push(" OR ");
                }
                query.push(format!("{column} ILIKE ")).push_bind(pattern.clone());
            }
            query.push(")");
        }
    }
}
