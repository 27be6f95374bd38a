//! Error types for atlas-analysis

use thiserror::Error;

/// Analyzer error type
///
/// These use the `AE` prefix (Analysis Error) to avoid collisions with
/// quality finding codes, which use plain `Q` codes.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// AE001: An analyzer ran before a section it cannot synthesize
    #[error("[AE001] Analyzer '{analyzer}' requires the '{requires}' section, which has not been produced")]
    PrecedenceViolation { analyzer: String, requires: String },

    /// AE002: Analyzer name not registered
    #[error("[AE002] Unknown analyzer '{name}'")]
    UnknownAnalyzer { name: String },

    /// AE003: Provider error propagation
    #[error("[AE003] Provider error: {0}")]
    Provider(#[from] atlas_db::DbError),

    /// AE004: SQL text error propagation
    #[error("[AE004] SQL error: {0}")]
    Sql(#[from] atlas_sql::SqlError),

    /// AE005: Core error propagation
    #[error("[AE005] Core error: {0}")]
    Core(#[from] atlas_core::CoreError),
}

/// Result type alias for AnalysisError
pub type AnalyzeResult<T> = Result<T, AnalysisError>;
