//! Cached trial start timestamps.
//!
//! The cache is not authoritative; it only pins the first value observed for
//! a user so the trial window does not drift.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::types::DatabaseResult;

#[derive(Clone)]
pub struct TrialRepository {
    pool: SqlitePool,
}

impl TrialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Cached trial start for `user_id`, storing `fallback` on first use.
    pub async fn trial_start(
        &self,
        user_id: i64,
        fallback: DateTime<Utc>,
    ) -> DatabaseResult<DateTime<Utc>> {
        sqlx::query("INSERT OR IGNORE INTO trial_starts (user_id, started_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(fallback.to_rfc3339())
            .execute(&self.pool)
            .await?;

        let started_at: String =
            sqlx::query_scalar("SELECT started_at FROM trial_starts WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(DateTime::parse_from_rfc3339(&started_at)?.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, test_pool};
    use chrono::Duration;

    #[tokio::test]
    async fn first_observed_start_is_kept() {
        let (pool, _dir) = test_pool().await;
        let user_id = insert_user(&pool, "hopper@example.com").await;
        let repo = TrialRepository::new(pool);

        let first = Utc::now() - Duration::days(3);
        let later = Utc::now();

        let cached = repo.trial_start(user_id, first).await.unwrap();
        let again = repo.trial_start(user_id, later).await.unwrap();

        assert_eq!(cached.timestamp(), first.timestamp());
        assert_eq!(again.timestamp(), first.timestamp());
    }
}
