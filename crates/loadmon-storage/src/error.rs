/// Errors that can occur within the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A sample referenced a host id that is not registered.
    #[error("Storage: unknown host id {0}")]
    UnknownHost(i64),

    /// A host alias was expected to exist after registration but could not
    /// be read back, which should be unreachable under normal conditions.
    #[error("Storage: host '{0}' registered but the row could not be read back")]
    RegisterReadback(String),

    /// A stored epoch second that chrono cannot represent, which only
    /// happens when the record table was written by something else.
    #[error("Storage: record timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while exporting.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failure during export.
    #[error("Storage: {0}")]
    Record(#[from] loadmon_common::records::RecordError),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
