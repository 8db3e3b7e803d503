//! Shared database types

pub mod errors;

pub use errors::DatabaseError;

/// Result type for repository operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
