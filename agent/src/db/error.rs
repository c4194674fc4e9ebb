//! Error types for the local record store.

use thiserror::Error;

/// Errors returned by local store operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    InvalidRecord(#[from] fieldsync_engine::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
