//! Profiling analyzer: row counts and per-column statistics

use crate::analyzer::Analyzer;
use crate::context::AnalysisContext;
use crate::error::AnalyzeResult;
use crate::schema::optional;
use async_trait::async_trait;
use atlas_core::dag::PROFILING;
use atlas_core::{Section, SectionData, TableProfile};
use std::collections::HashMap;

pub struct ProfilingAnalyzer;

#[async_trait]
impl Analyzer for ProfilingAnalyzer {
    fn name(&self) -> &'static str {
        PROFILING
    }

    fn section(&self) -> Section {
        Section::Profiles
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<SectionData> {
        let provider = ctx.provider();
        let settings = &ctx.config().profiling;

        let counts = optional("row counts", ctx.database(), provider.table_row_counts().await);
        let count_by_table: HashMap<String, i64> = counts
            .iter()
            .map(|c| (format!("{}.{}", c.schema, c.table).to_lowercase(), c.row_count))
            .collect();

        // Tables come from the schema inventory when present, else from the counts.
        let tables: Vec<(String, String)> = match ctx.schema() {
            Some(inventory) => inventory
                .tables
                .iter()
                .map(|t| (t.schema.clone(), t.name.clone()))
                .collect(),
            None => counts
                .iter()
                .map(|c| (c.schema.clone(), c.table.clone()))
                .collect(),
        };

        let mut profiles = Vec::with_capacity(tables.len());
        for (i, (schema, table)) in tables.into_iter().enumerate() {
            let row_count = count_by_table
                .get(&format!("{}.{}", schema, table).to_lowercase())
                .copied();

            let columns = if settings.profile_columns && i < settings.max_tables {
                match provider.profile_table(&schema, &table).await {
                    Ok(columns) => columns,
                    Err(e) => {
                        log::warn!("Failed to profile {}.{}: {}", schema, table, e);
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };

            profiles.push(TableProfile {
                database: None,
                schema,
                table,
                row_count,
                columns,
            });
        }

        Ok(SectionData::Profiles(profiles))
    }
}
