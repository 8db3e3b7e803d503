//! Error types for the database layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::QueryError(error.to_string())
    }
}

impl From<chrono::ParseError> for DatabaseError {
    fn from(error: chrono::ParseError) -> Self {
        DatabaseError::InvalidData(format!("timestamp: {error}"))
    }
}
