use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::VerificationConfig;

/// Pagination block of list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let limit = limit.max(1);
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

/// `?page=&limit=` with 1-based pages
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// `(page, limit, offset)` clamped to the configured page size bounds
    pub fn resolve(&self, config: &VerificationConfig) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);
        (page, limit, (page - 1) * limit)
    }
}

/// Serialize `record` and add `extra` top-level fields to the object
pub fn with_fields<T: Serialize>(record: &T, extra: Value) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(record)?;
    if let (Value::Object(target), Value::Object(extra)) = (&mut value, extra) {
        target.extend(extra);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pages_round_up() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(2, 10, 11).pages, 2);
    }

    #[test]
    fn page_query_is_clamped() {
        let config = VerificationConfig::default();
        assert_eq!(PageQuery::default().resolve(&config), (1, 10, 0));

        let query = PageQuery {
            page: Some(3),
            limit: Some(500),
        };
        assert_eq!(query.resolve(&config), (3, 100, 200));

        let query = PageQuery {
            page: Some(0),
            limit: Some(0),
        };
        assert_eq!(query.resolve(&config), (1, 1, 0));
    }

    #[test]
    fn extra_fields_are_merged() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Row {
            phone_verified: bool,
        }

        let value = with_fields(
            &Row { phone_verified: false },
            json!({"requiresPhoneVerification": true}),
        )
        .unwrap();
        assert_eq!(value, json!({"phoneVerified": false, "requiresPhoneVerification": true}));
    }
}
