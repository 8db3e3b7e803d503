//! Meeting preference repository.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::entities::StoredPreferences;
use crate::types::DatabaseResult;

#[derive(Clone)]
pub struct PreferencesRepository {
    pool: SqlitePool,
}

impl PreferencesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, user_id: i64) -> DatabaseResult<Option<StoredPreferences>> {
        let preferences = sqlx::query_as::<_, StoredPreferences>(
            "SELECT user_id, meeting_duration_minutes, buffer_minutes, timezone FROM user_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(preferences)
    }

    pub async fn upsert(&self, preferences: &StoredPreferences) -> DatabaseResult<StoredPreferences> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, meeting_duration_minutes, buffer_minutes, timezone, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                meeting_duration_minutes = excluded.meeting_duration_minutes,
                buffer_minutes = excluded.buffer_minutes,
                timezone = excluded.timezone,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(preferences.user_id)
        .bind(preferences.meeting_duration_minutes)
        .bind(preferences.buffer_minutes)
        .bind(&preferences.timezone)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(preferences.clone())
    }
}
