use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StoredPreferences {
    pub user_id: i64,
    pub meeting_duration_minutes: i64,
    pub buffer_minutes: i64,
    pub timezone: String,
}
