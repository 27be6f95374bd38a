//! Engine-agnostic catalog and telemetry row shapes returned by providers
//!
//! These rows feed analyzers but are not stored in results verbatim.

use crate::result::schema::ObjectType;
use serde::{Deserialize, Serialize};

/// A database discovered on a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub name: String,
    #[serde(default = "default_online")]
    pub is_online: bool,
    #[serde(default)]
    pub is_system: bool,
}

fn default_online() -> bool {
    true
}

impl DatabaseEntry {
    pub fn online(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_online: true,
            is_system: false,
        }
    }
}

/// Names that are engine system databases on SQL Server, PostgreSQL and DuckDB
pub const SYSTEM_DATABASES: &[&str] = &[
    "master",
    "model",
    "msdb",
    "tempdb",
    "distribution",
    "resource",
    "postgres",
    "template0",
    "template1",
    "system",
    "temp",
];

/// Whether a database name belongs to the built-in system set
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRowCount {
    pub schema: String,
    pub table: String,
    pub row_count: i64,
}

/// An edge from the engine's own object-dependency catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDependency {
    pub from_schema: String,
    pub from_name: String,
    pub from_type: ObjectType,
    pub to_schema: String,
    pub to_name: String,
    pub to_type: ObjectType,
    #[serde(default)]
    pub to_database: Option<String>,
}

/// An engine-reported missing-index suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingIndexCandidate {
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub equality_columns: Vec<String>,
    #[serde(default)]
    pub inequality_columns: Vec<String>,
    #[serde(default)]
    pub included_columns: Vec<String>,
    #[serde(default)]
    pub user_seeks: i64,
    #[serde(default)]
    pub user_scans: i64,
    #[serde(default)]
    pub avg_total_user_cost: f64,
    /// Estimated improvement percentage (0-100)
    #[serde(default)]
    pub avg_user_impact: f64,
}

impl MissingIndexCandidate {
    /// Impact score = average cost x average impact x (seeks + scans)
    pub fn impact_score(&self) -> f64 {
        self.avg_total_user_cost * self.avg_user_impact * (self.user_seeks + self.user_scans) as f64
    }
}

/// Read/write telemetry for a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableUsageStats {
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub reads: i64,
    #[serde(default)]
    pub writes: i64,
}

/// Execution telemetry for a procedure or function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineUsageStats {
    pub schema: String,
    pub name: String,
    pub object_type: ObjectType,
    #[serde(default)]
    pub execution_count: i64,
}
