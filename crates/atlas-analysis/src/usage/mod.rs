//! Usage analyzer: classifies objects as active, low, unused or unknown
//!
//! Each [`UsageSignal`] contributes weighted observations; an object's score
//! is the mean weight of everything observed about it.

mod signals;

pub use signals::{
    looks_abandoned, NamingSignal, Observation, OrphanSignal, RowCountSignal, TelemetrySignal,
    UsageSignal,
};

use crate::analyzer::Analyzer;
use crate::context::AnalysisContext;
use crate::error::AnalyzeResult;
use async_trait::async_trait;
use atlas_core::dag::USAGE;
use atlas_core::{ObjectType, ObjectUsage, Section, SectionData, UsageAnalysis, UsageClass};
use signals::tally;

/// Runs a fixed list of signals and aggregates their observations
pub struct UsageScoringEngine {
    signals: Vec<Box<dyn UsageSignal>>,
}

impl UsageScoringEngine {
    pub fn new(signals: Vec<Box<dyn UsageSignal>>) -> Self {
        Self { signals }
    }

    /// Telemetry, row counts, orphan detection and naming patterns
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Box::new(TelemetrySignal),
            Box::new(RowCountSignal),
            Box::new(OrphanSignal),
            Box::new(NamingSignal),
        ])
    }

    pub fn signal_names(&self) -> Vec<&'static str> {
        self.signals.iter().map(|s| s.name()).collect()
    }

    /// Score every table, view, procedure and function in the inventory.
    ///
    /// A failing signal is logged and listed in `skipped_signals`; the
    /// remaining signals still contribute.
    pub async fn score(&self, ctx: &AnalysisContext<'_>) -> UsageAnalysis {
        let mut observations = Vec::new();
        let mut skipped_signals = Vec::new();
        for signal in &self.signals {
            match signal.evaluate(ctx).await {
                Ok(found) => {
                    observations.extend(found.into_iter().map(|o| (signal.name(), o)));
                }
                Err(e) => {
                    log::warn!(
                        "Usage signal '{}' skipped for {}: {}",
                        signal.name(),
                        ctx.database().unwrap_or("<server>"),
                        e
                    );
                    skipped_signals.push(signal.name().to_string());
                }
            }
        }
        let mut groups = tally(observations);

        let mut objects = Vec::new();
        for (schema, name, object_type) in universe(ctx) {
            let key = (format!("{}.{}", schema, name).to_lowercase(), object_type);
            let usage = match groups.remove(&key) {
                Some(t) if t.count > 0 => {
                    let score = t.sum / t.count as f64;
                    ObjectUsage {
                        database: None,
                        schema,
                        name,
                        object_type,
                        score: Some(score),
                        classification: UsageClass::from_score(score),
                        evidence: t.evidence,
                    }
                }
                _ => ObjectUsage {
                    database: None,
                    schema,
                    name,
                    object_type,
                    score: None,
                    classification: UsageClass::Unknown,
                    evidence: Vec::new(),
                },
            };
            objects.push(usage);
        }

        let mut analysis = UsageAnalysis {
            objects,
            skipped_signals,
        };
        analysis.sort_objects();
        analysis
    }
}

/// Objects eligible for classification
fn universe(ctx: &AnalysisContext<'_>) -> Vec<(String, String, ObjectType)> {
    let Some(inventory) = ctx.schema() else {
        return Vec::new();
    };
    let tables = inventory
        .tables
        .iter()
        .map(|t| (t.schema.clone(), t.name.clone(), ObjectType::Table));
    let views = inventory
        .views
        .iter()
        .map(|v| (v.schema.clone(), v.name.clone(), ObjectType::View));
    let procedures = inventory
        .procedures
        .iter()
        .map(|r| (r.schema.clone(), r.name.clone(), ObjectType::Procedure));
    let functions = inventory
        .functions
        .iter()
        .map(|r| (r.schema.clone(), r.name.clone(), ObjectType::Function));
    tables.chain(views).chain(procedures).chain(functions).collect()
}

pub struct UsageAnalyzer {
    engine: UsageScoringEngine,
}

impl UsageAnalyzer {
    pub fn new(engine: UsageScoringEngine) -> Self {
        Self { engine }
    }

    pub fn with_defaults() -> Self {
        Self::new(UsageScoringEngine::with_defaults())
    }
}

#[async_trait]
impl Analyzer for UsageAnalyzer {
    fn name(&self) -> &'static str {
        USAGE
    }

    fn section(&self) -> Section {
        Section::Usage
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<SectionData> {
        ctx.require_schema(USAGE)?;
        Ok(SectionData::Usage(self.engine.score(ctx).await))
    }
}

#[cfg(test)]
#[path = "usage_test.rs"]
mod tests;
