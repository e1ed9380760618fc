//! Repository errors

use relay_common::AppError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Errors returned by repositories
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Convert SQLx error to RepositoryError
pub fn map_db_error(e: SqlxError) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> RepositoryError
where
    F: FnOnce() -> RepositoryError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    map_db_error(e)
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UsernameTaken(username) => {
                AppError::AlreadyExists(format!("username {username}"))
            }
            RepositoryError::Database(msg) => AppError::Database(msg),
        }
    }
}
