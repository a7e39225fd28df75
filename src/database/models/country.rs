use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: i32,
    pub code: String,
    pub name: String,
    /// Dialing prefix without `+`, e.g. `94`
    pub phone_prefix: String,
    pub is_active: bool,
}
