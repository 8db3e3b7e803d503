//! Pending WhatsApp verifications.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::entities::PendingVerification;
use crate::types::DatabaseResult;

#[derive(Clone)]
pub struct VerificationRepository {
    pool: SqlitePool,
}

impl VerificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store the number a code was dispatched to, replacing any earlier one.
    pub async fn record(
        &self,
        user_id: i64,
        phone_number: &str,
        expires_at: DateTime<Utc>,
    ) -> DatabaseResult<PendingVerification> {
        sqlx::query(
            r#"
            INSERT INTO whatsapp_verifications (user_id, phone_number, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                phone_number = excluded.phone_number,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(user_id)
        .bind(phone_number)
        .bind(expires_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(PendingVerification {
            user_id,
            phone_number: phone_number.to_owned(),
            expires_at,
        })
    }

    pub async fn find(&self, user_id: i64) -> DatabaseResult<Option<PendingVerification>> {
        let row = sqlx::query(
            "SELECT phone_number, expires_at FROM whatsapp_verifications WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: String = row.try_get("expires_at")?;
        let expires_at = DateTime::parse_from_rfc3339(&expires_at)?.with_timezone(&Utc);

        Ok(Some(PendingVerification {
            user_id,
            phone_number: row.try_get("phone_number")?,
            expires_at,
        }))
    }

    pub async fn clear(&self, user_id: i64) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM whatsapp_verifications WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
