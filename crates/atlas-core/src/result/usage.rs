//! Usage classification

use crate::result::schema::ObjectType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score at or above which an object is `Active`
pub const ACTIVE_THRESHOLD: f64 = 0.3;
/// Score at or above which an object is `Low` (below it is `Unused`)
pub const LOW_THRESHOLD: f64 = -0.3;

/// Usage classification, ordered least-used first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UsageClass {
    Unused,
    Low,
    Active,
    /// No signal produced any observation
    Unknown,
}

impl UsageClass {
    /// Classify an averaged score
    pub fn from_score(score: f64) -> Self {
        if score >= ACTIVE_THRESHOLD {
            UsageClass::Active
        } else if score >= LOW_THRESHOLD {
            UsageClass::Low
        } else {
            UsageClass::Unused
        }
    }
}

impl fmt::Display for UsageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageClass::Unused => write!(f, "unused"),
            UsageClass::Low => write!(f, "low"),
            UsageClass::Active => write!(f, "active"),
            UsageClass::Unknown => write!(f, "unknown"),
        }
    }
}

/// Aggregated usage for one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectUsage {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
    pub object_type: ObjectType,
    /// Mean of all observation weights; `None` when unobserved
    #[serde(default)]
    pub score: Option<f64>,
    pub classification: UsageClass,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Output of the usage analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageAnalysis {
    /// Sorted least-used first
    #[serde(default)]
    pub objects: Vec<ObjectUsage>,
    /// Signals that failed and were skipped
    #[serde(default)]
    pub skipped_signals: Vec<String>,
}

impl UsageAnalysis {
    /// Classification ascending, then score ascending (unscored last)
    pub fn sort_objects(&mut self) {
        self.objects.sort_by(|a, b| {
            a.classification.cmp(&b.classification).then_with(|| {
                let sa = a.score.unwrap_or(f64::MAX);
                let sb = b.score.unwrap_or(f64::MAX);
                sa.total_cmp(&sb)
            })
        });
    }
}
