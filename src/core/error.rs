use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Storage access failed: {0}")]
    StorageError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Persistence layer has been shut down")]
    ShutDown,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DbError {
    /// Errors the caller may retry with a fresh unit of work.
    ///
    /// The session manager never retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::StorageError(_))
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
