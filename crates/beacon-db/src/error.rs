//! Error type shared by the event log and time-series stores.

/// I/O failure on either store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A SQL statement failed.
    #[error("store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection could be obtained.
    #[error("store connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A stored JSON column could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row no longer decodes into its domain type.
    #[error("store record is corrupt: {0}")]
    Corrupt(String),

    /// The blocking task running the operation panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
