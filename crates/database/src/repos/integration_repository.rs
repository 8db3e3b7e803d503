//! Integration status repository.
//!
//! Every write is an upsert keyed by `user_id`. There is no versioning, the
//! last writer wins.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::entities::IntegrationStatus;
use crate::types::DatabaseResult;

#[derive(Clone)]
pub struct IntegrationRepository {
    pool: SqlitePool,
}

impl IntegrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored status, or the initial record when the user has none yet.
    pub async fn find(&self, user_id: i64) -> DatabaseResult<IntegrationStatus> {
        let status = sqlx::query_as::<_, IntegrationStatus>(
            r#"
            SELECT user_id, calendar_connected, whatsapp_connected, onboarding_step, onboarding_completed
            FROM user_integrations
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(status.unwrap_or_else(|| IntegrationStatus::initial(user_id)))
    }

    pub async fn upsert(&self, status: &IntegrationStatus) -> DatabaseResult<IntegrationStatus> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO user_integrations (
                user_id, calendar_connected, whatsapp_connected, onboarding_step, onboarding_completed, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                calendar_connected = excluded.calendar_connected,
                whatsapp_connected = excluded.whatsapp_connected,
                onboarding_step = excluded.onboarding_step,
                onboarding_completed = excluded.onboarding_completed,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(status.user_id)
        .bind(status.calendar_connected)
        .bind(status.whatsapp_connected)
        .bind(status.onboarding_step)
        .bind(status.onboarding_completed)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(user_id = status.user_id, step = status.onboarding_step, "integration status stored");
        Ok(status.clone())
    }

    pub async fn set_calendar_connected(
        &self,
        user_id: i64,
        connected: bool,
    ) -> DatabaseResult<IntegrationStatus> {
        let mut status = self.find(user_id).await?;
        status.calendar_connected = connected;
        self.upsert(&status).await
    }

    pub async fn set_whatsapp_connected(
        &self,
        user_id: i64,
        connected: bool,
    ) -> DatabaseResult<IntegrationStatus> {
        let mut status = self.find(user_id).await?;
        status.whatsapp_connected = connected;
        self.upsert(&status).await
    }

    pub async fn set_step(&self, user_id: i64, step: i64) -> DatabaseResult<IntegrationStatus> {
        let mut status = self.find(user_id).await?;
        status.onboarding_step = step;
        self.upsert(&status).await
    }

    pub async fn complete_onboarding(&self, user_id: i64) -> DatabaseResult<IntegrationStatus> {
        let mut status = self.find(user_id).await?;
        status.onboarding_completed = true;
        self.upsert(&status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, test_pool};

    #[tokio::test]
    async fn missing_row_reads_as_initial_status() {
        let (pool, _dir) = test_pool().await;
        let user_id = insert_user(&pool, "ada@example.com").await;

        let status = IntegrationRepository::new(pool).find(user_id).await.unwrap();

        assert_eq!(status, IntegrationStatus::initial(user_id));
    }

    #[tokio::test]
    async fn upsert_overwrites_previous_values() {
        let (pool, _dir) = test_pool().await;
        let user_id = insert_user(&pool, "ada@example.com").await;
        let repo = IntegrationRepository::new(pool.clone());

        repo.set_calendar_connected(user_id, true).await.unwrap();
        repo.set_step(user_id, 2).await.unwrap();
        repo.set_whatsapp_connected(user_id, true).await.unwrap();
        let done = repo.complete_onboarding(user_id).await.unwrap();

        assert!(done.calendar_connected);
        assert!(done.whatsapp_connected);
        assert!(done.onboarding_completed);
        assert_eq!(done.onboarding_step, 2);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_integrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
