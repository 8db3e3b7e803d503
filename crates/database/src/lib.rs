//! Cadence Database Crate
//!
//! Connection management, migrations, and the repositories for the state the
//! dashboard service keeps locally: integration flags, meeting preferences,
//! pending WhatsApp verifications and cached trial starts. Users and sessions
//! are owned by `cadence-auth` but live in the same schema.

use cadence_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};

pub use entities::{
    integration::FIRST_ONBOARDING_STEP, IntegrationStatus, PendingVerification, StoredPreferences,
};
pub use repos::{
    IntegrationRepository, PreferencesRepository, TrialRepository, VerificationRepository,
};
pub use types::{DatabaseError, DatabaseResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    pub async fn test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
            max_connections: 2,
        };
        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    pub async fn insert_user(pool: &SqlitePool, email: &str) -> i64 {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (public_id, email, display_name, created_at, updated_at) VALUES (?, ?, NULL, ?, ?)",
        )
        .bind(format!("pub-{email}"))
        .bind(email)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }
}
