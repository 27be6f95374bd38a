//! Error types for atlas-core

use thiserror::Error;

/// Core error type for dbatlas
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Circular dependency between analyzers
    #[error("[C004] Circular analyzer dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// C005: Analyzer name not present in the dependency table
    #[error("[C005] Unknown analyzer: {name}")]
    UnknownAnalyzer { name: String },

    /// C006: Empty name where a non-empty one is required
    #[error("[C006] Empty name: {context}")]
    EmptyName { context: String },

    /// C007: IO error
    #[error("[C007] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C008: YAML parse error
    #[error("[C008] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
