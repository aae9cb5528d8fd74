//! Error types shared by the service crates

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Error type for database access
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred while opening the pool
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A stored value could not be decoded into a domain type
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::Query(err)
    }
}

impl DatabaseError {
    /// True when the underlying statement violated a unique constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Query(SqlxError::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
