//! Data-quality findings

use crate::result::schema::ObjectType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One data-quality finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    #[serde(default)]
    pub database: Option<String>,
    /// Stable check code (e.g. "Q001")
    pub code: String,
    pub severity: Severity,
    pub schema: String,
    pub object: String,
    pub object_type: ObjectType,
    #[serde(default)]
    pub column: Option<String>,
    pub message: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}
