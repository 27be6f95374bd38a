//! Error types for atlas-db

use thiserror::Error;

/// Provider operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Insufficient privileges, e.g. for usage telemetry (D003)
    #[error("[D003] Permission denied: {0}")]
    PermissionDenied(String),

    /// The engine has no equivalent for the requested query (D004)
    #[error("[D004] Not supported by {backend}: {feature}")]
    NotSupported { backend: String, feature: String },

    /// Malformed connection string (D005)
    #[error("[D005] Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Row decoding failed (D007)
    #[error("[D007] Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),

    /// IO error (D008)
    #[error("[D008] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    pub(crate) fn not_supported(backend: &str, feature: &str) -> Self {
        DbError::NotSupported {
            backend: backend.to_string(),
            feature: feature.to_string(),
        }
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants; classify by message.
        let msg = err.to_string();
        if msg.contains("Permission") || msg.contains("permission denied") {
            DbError::PermissionDenied(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
