//! Error types for atlas-sql

use thiserror::Error;

/// SQL text errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Unknown dialect name (S003)
    #[error("[S003] Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    /// Malformed multi-part object name (S004)
    #[error("[S004] Invalid object name '{0}'")]
    InvalidName(String),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
