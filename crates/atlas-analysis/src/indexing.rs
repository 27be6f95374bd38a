//! Indexing analyzer: index inventory plus unused, missing and duplicate advice

use crate::analyzer::Analyzer;
use crate::context::AnalysisContext;
use crate::error::AnalyzeResult;
use async_trait::async_trait;
use atlas_core::catalog::MissingIndexCandidate;
use atlas_core::dag::INDEXING;
use atlas_core::{
    IndexAnalysis, IndexRecommendation, IndexUsage, RecommendationKind, RecommendationSeverity,
    Section, SectionData,
};
use std::collections::BTreeMap;

const CRITICAL_IMPACT: f64 = 1_000_000.0;
const HIGH_IMPACT: f64 = 100_000.0;
const MEDIUM_IMPACT: f64 = 10_000.0;

/// Severity tier for a missing-index impact score
pub fn impact_tier(score: f64) -> RecommendationSeverity {
    if score >= CRITICAL_IMPACT {
        RecommendationSeverity::Critical
    } else if score >= HIGH_IMPACT {
        RecommendationSeverity::High
    } else if score >= MEDIUM_IMPACT {
        RecommendationSeverity::Medium
    } else {
        RecommendationSeverity::Low
    }
}

/// Non-unique, non-clustered indexes that are maintained but never read
pub fn unused_indexes(inventory: &[IndexUsage]) -> Vec<IndexRecommendation> {
    inventory
        .iter()
        .filter(|u| {
            let ix = &u.index;
            !ix.is_unique && !ix.is_clustered && !ix.is_primary_key && u.reads == 0 && u.writes > 0
        })
        .map(|u| IndexRecommendation {
            database: None,
            kind: RecommendationKind::Unused,
            severity: RecommendationSeverity::Medium,
            schema: u.index.schema.clone(),
            table: u.index.table.clone(),
            index_name: Some(u.index.name.clone()),
            columns: u.index.columns.clone(),
            impact_score: None,
            message: format!(
                "Index {} is never read but written {} times; consider dropping it",
                u.index.name, u.writes
            ),
        })
        .collect()
}

/// Engine-suggested indexes, highest impact first
pub fn missing_indexes(candidates: &[MissingIndexCandidate]) -> Vec<IndexRecommendation> {
    let mut recs: Vec<IndexRecommendation> = candidates
        .iter()
        .map(|c| {
            let score = c.impact_score();
            let mut columns = c.equality_columns.clone();
            columns.extend(c.inequality_columns.iter().cloned());
            let include = if c.included_columns.is_empty() {
                String::new()
            } else {
                format!(" INCLUDE ({})", c.included_columns.join(", "))
            };
            IndexRecommendation {
                database: None,
                kind: RecommendationKind::Missing,
                severity: impact_tier(score),
                schema: c.schema.clone(),
                table: c.table.clone(),
                index_name: None,
                message: format!(
                    "Missing index on {}.{} ({}){}; impact score {:.0}",
                    c.schema,
                    c.table,
                    columns.join(", "),
                    include,
                    score
                ),
                columns,
                impact_score: Some(score),
            }
        })
        .collect();
    recs.sort_by(|a, b| {
        b.impact_score
            .unwrap_or_default()
            .total_cmp(&a.impact_score.unwrap_or_default())
    });
    recs
}

fn is_strict_prefix(short: &[String], long: &[String]) -> bool {
    short.len() < long.len()
        && short
            .iter()
            .zip(long)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// Indexes whose key columns are a strict prefix of another index on the
/// same table.
///
/// Unique and primary-key indexes are never reported as the redundant one.
/// Identical column lists are not a prefix relation and are not reported.
pub fn duplicate_indexes(inventory: &[IndexUsage]) -> Vec<IndexRecommendation> {
    let mut by_table: BTreeMap<String, Vec<&IndexUsage>> = BTreeMap::new();
    for usage in inventory.iter().filter(|u| !u.index.columns.is_empty()) {
        let key = format!("{}.{}", usage.index.schema, usage.index.table).to_lowercase();
        by_table.entry(key).or_default().push(usage);
    }

    let mut recs = Vec::new();
    for indexes in by_table.values() {
        for (i, short) in indexes.iter().enumerate() {
            let ix = &short.index;
            if ix.is_unique || ix.is_primary_key {
                continue;
            }
            let covering = indexes.iter().enumerate().find(|(j, long)| {
                *j != i && is_strict_prefix(&ix.columns, &long.index.columns)
            });
            let Some((_, long)) = covering else {
                continue;
            };
            recs.push(IndexRecommendation {
                database: None,
                kind: RecommendationKind::Duplicate,
                severity: RecommendationSeverity::Low,
                schema: ix.schema.clone(),
                table: ix.table.clone(),
                index_name: Some(ix.name.clone()),
                columns: ix.columns.clone(),
                impact_score: None,
                message: format!(
                    "Index {} ({}) is covered by {} ({})",
                    ix.name,
                    ix.columns.join(", "),
                    long.index.name,
                    long.index.columns.join(", ")
                ),
            });
        }
    }
    recs
}

pub struct IndexingAnalyzer;

impl IndexingAnalyzer {
    /// Usage inventory from telemetry, else the catalog with zeroed counters.
    ///
    /// Returns the inventory and whether telemetry was available.
    async fn inventory(ctx: &AnalysisContext<'_>) -> (Vec<IndexUsage>, bool) {
        let provider = ctx.provider();
        let db = ctx.database().unwrap_or("<server>");
        match provider.index_usage().await {
            Ok(rows) => return (rows, true),
            Err(e) => log::info!("Index usage telemetry unavailable for {}: {}", db, e),
        }
        match provider.index_catalog().await {
            Ok(rows) => (rows.into_iter().map(IndexUsage::from_definition).collect(), false),
            Err(e) => {
                log::warn!("Index catalog unavailable for {}: {}", db, e);
                let from_schema = ctx
                    .schema()
                    .map(|s| s.indexes.iter().cloned().map(IndexUsage::from_definition).collect())
                    .unwrap_or_default();
                (from_schema, false)
            }
        }
    }
}

#[async_trait]
impl Analyzer for IndexingAnalyzer {
    fn name(&self) -> &'static str {
        INDEXING
    }

    fn section(&self) -> Section {
        Section::Indexes
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<SectionData> {
        let (inventory, telemetry_available) = Self::inventory(ctx).await;
        let candidates = match ctx.provider().missing_indexes().await {
            Ok(rows) => rows,
            Err(e) => {
                log::info!(
                    "Missing-index suggestions unavailable for {}: {}",
                    ctx.database().unwrap_or("<server>"),
                    e
                );
                Vec::new()
            }
        };

        let mut recommendations = Vec::new();
        if telemetry_available {
            recommendations.extend(unused_indexes(&inventory));
        }
        recommendations.extend(missing_indexes(&candidates));
        recommendations.extend(duplicate_indexes(&inventory));

        Ok(SectionData::Indexes(IndexAnalysis {
            inventory,
            recommendations,
            telemetry_available,
        }))
    }
}

#[cfg(test)]
#[path = "indexing_test.rs"]
mod tests;
