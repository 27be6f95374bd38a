//! Error types for atlas-runtime

use thiserror::Error;
use uuid::Uuid;

/// Session and scheduling errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// R001: Requested analyzer is not in the dependency table
    #[error("[R001] Unknown analyzer '{name}'")]
    UnknownAnalyzer { name: String },

    /// R002: No live session with this id
    #[error("[R002] Session not found: {id}")]
    SessionNotFound { id: Uuid },

    /// R003: The run was cancelled or superseded
    #[error("[R003] Analysis cancelled")]
    Cancelled,

    /// R004: No factory registered for the provider type
    #[error("[R004] Unsupported provider '{0}'")]
    UnsupportedProvider(String),

    /// R005: Analyzer failure
    #[error("[R005] {0}")]
    Analysis(#[from] atlas_analysis::AnalysisError),

    /// R006: Provider failure
    #[error("[R006] {0}")]
    Provider(#[from] atlas_db::DbError),

    /// R007: Core failure
    #[error("[R007] {0}")]
    Core(#[from] atlas_core::CoreError),
}

/// Result type alias for RuntimeError
pub type RuntimeResult<T> = Result<T, RuntimeError>;
