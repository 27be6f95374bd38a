//! Index inventory and recommendations

use crate::result::schema::IndexDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An index with its usage counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexUsage {
    #[serde(flatten)]
    pub index: IndexDefinition,
    /// Seeks + scans + lookups
    #[serde(default)]
    pub reads: i64,
    /// Updates
    #[serde(default)]
    pub writes: i64,
}

impl IndexUsage {
    /// Usage row with zeroed counters
    pub fn from_definition(index: IndexDefinition) -> Self {
        Self {
            index,
            reads: 0,
            writes: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationKind {
    Unused,
    Missing,
    Duplicate,
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationKind::Unused => write!(f, "unused"),
            RecommendationKind::Missing => write!(f, "missing"),
            RecommendationKind::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// Recommendation severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecommendationSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecommendation {
    #[serde(default)]
    pub database: Option<String>,
    pub kind: RecommendationKind,
    pub severity: RecommendationSeverity,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub index_name: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub impact_score: Option<f64>,
    pub message: String,
}

/// Output of the indexing analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexAnalysis {
    #[serde(default)]
    pub inventory: Vec<IndexUsage>,
    #[serde(default)]
    pub recommendations: Vec<IndexRecommendation>,
    /// False when usage telemetry was unavailable and counters are zeroed
    #[serde(default)]
    pub telemetry_available: bool,
}
