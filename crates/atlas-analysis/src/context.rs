//! Analysis context: what every analyzer can read during one run

use crate::error::{AnalysisError, AnalyzeResult};
use atlas_core::{AnalysisResult, Config, RelationshipGraph, SchemaInventory};
use atlas_db::CatalogProvider;
use std::sync::Arc;

/// Read-only inputs for one analyzer invocation.
///
/// `prior` holds the sections already produced for this database (by
/// earlier steps of the same run or by earlier runs); analyzers read
/// their dependencies from it and return only the section they own.
pub struct AnalysisContext<'a> {
    provider: Arc<dyn CatalogProvider>,
    database: Option<String>,
    prior: &'a AnalysisResult,
    config: &'a Config,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        prior: &'a AnalysisResult,
        config: &'a Config,
    ) -> Self {
        let database = provider.database_name().map(str::to_string);
        Self {
            provider,
            database,
            prior,
            config,
        }
    }

    pub fn provider(&self) -> &dyn CatalogProvider {
        self.provider.as_ref()
    }

    /// Name of the database being analyzed, when the connection is scoped to one
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn prior(&self) -> &AnalysisResult {
        self.prior
    }

    pub fn schema(&self) -> Option<&SchemaInventory> {
        self.prior.schema.as_ref()
    }

    pub fn relationships(&self) -> Option<&RelationshipGraph> {
        self.prior.relationships.as_ref()
    }

    /// The schema inventory, or `PrecedenceViolation` when it has not run
    pub fn require_schema(&self, analyzer: &str) -> AnalyzeResult<&SchemaInventory> {
        self.schema().ok_or_else(|| AnalysisError::PrecedenceViolation {
            analyzer: analyzer.to_string(),
            requires: atlas_core::dag::SCHEMA.to_string(),
        })
    }
}
