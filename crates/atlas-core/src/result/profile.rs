//! Data profiles

use serde::{Deserialize, Serialize};

/// Statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub column: String,
    #[serde(default)]
    pub data_type: Option<String>,
    /// Fraction of NULL values in `[0, 1]`
    #[serde(default)]
    pub null_fraction: Option<f64>,
    #[serde(default)]
    pub distinct_count: Option<i64>,
}

/// Row count and column statistics for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub columns: Vec<ColumnProfile>,
}
