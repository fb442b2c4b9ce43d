use std::path::PathBuf;
use thiserror::Error;

/// Record store failures.
///
/// The matcher never surfaces these to a caller: every variant collapses to
/// "no match" after being logged.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Snapshot could not be read
    #[error("Failed to read records from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot is not valid CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row does not have exactly three fields
    #[error("Malformed record on line {line}: expected 3 fields, found {fields}")]
    MalformedRow { line: u64, fields: usize },

    /// Store was made unavailable (in-memory store only)
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

impl From<StorageError> for doorbot_core::Error {
    fn from(err: StorageError) -> Self {
        doorbot_core::Error::RecordStoreUnavailable(err.to_string())
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
