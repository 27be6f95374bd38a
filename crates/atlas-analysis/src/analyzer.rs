//! Analyzer trait and the closed registry of built-in analyzers

use crate::context::AnalysisContext;
use crate::error::{AnalysisError, AnalyzeResult};
use crate::indexing::IndexingAnalyzer;
use crate::profiling::ProfilingAnalyzer;
use crate::quality::QualityAnalyzer;
use crate::relationships::RelationshipsAnalyzer;
use crate::schema::SchemaAnalyzer;
use crate::usage::UsageAnalyzer;
use async_trait::async_trait;
use atlas_core::{AnalyzerDag, CoreError, CoreResult, Section, SectionData};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named unit producing one section of the result
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Registry name (matches the analyzer DAG)
    fn name(&self) -> &'static str;

    /// The section this analyzer owns
    fn section(&self) -> Section;

    /// Produce the owned section from provider data and prior sections
    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<SectionData>;
}

/// Analyzer implementations by name, resolved once at construction
#[derive(Clone)]
pub struct AnalyzerRegistry {
    analyzers: BTreeMap<String, Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            analyzers: BTreeMap::new(),
        }
    }

    /// Registry with all built-in analyzers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SchemaAnalyzer));
        registry.register(Arc::new(ProfilingAnalyzer));
        registry.register(Arc::new(RelationshipsAnalyzer));
        registry.register(Arc::new(QualityAnalyzer));
        registry.register(Arc::new(UsageAnalyzer::with_defaults()));
        registry.register(Arc::new(IndexingAnalyzer));
        registry
    }

    /// Add or replace an analyzer
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers
            .insert(analyzer.name().to_string(), analyzer);
    }

    pub fn get(&self, name: &str) -> AnalyzeResult<Arc<dyn Analyzer>> {
        self.analyzers
            .get(name)
            .cloned()
            .ok_or_else(|| AnalysisError::UnknownAnalyzer {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.analyzers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.analyzers.keys().map(String::as_str).collect()
    }

    /// The section owned by `name`
    pub fn section_for(&self, name: &str) -> Option<Section> {
        self.analyzers.get(name).map(|a| a.section())
    }

    /// Sections owned by each of `names`, skipping unregistered names
    pub fn sections_for<S: AsRef<str>>(&self, names: &[S]) -> Vec<Section> {
        let mut sections: Vec<Section> = names
            .iter()
            .filter_map(|n| self.section_for(n.as_ref()))
            .collect();
        sections.sort();
        sections.dedup();
        sections
    }

    /// Reverse lookup: the analyzer that owns `section`
    pub fn owner_of(&self, section: Section) -> Option<&str> {
        self.analyzers
            .iter()
            .find(|(_, a)| a.section() == section)
            .map(|(n, _)| n.as_str())
    }

    /// Check that every analyzer named in `dag` is registered
    pub fn check_dag(&self, dag: &AnalyzerDag) -> CoreResult<()> {
        match dag.analyzers().into_iter().find(|n| !self.contains(n)) {
            Some(name) => Err(CoreError::UnknownAnalyzer { name }),
            None => Ok(()),
        }
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_builtin_dag() {
        let registry = AnalyzerRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec!["indexing", "profiling", "quality", "relationships", "schema", "usage"]
        );
        registry.check_dag(&AnalyzerDag::with_defaults()).unwrap();
    }

    #[test]
    fn test_sections_for() {
        let registry = AnalyzerRegistry::with_defaults();
        assert_eq!(
            registry.sections_for(&["usage", "schema", "schema", "lineage"]),
            vec![Section::Schema, Section::Usage]
        );
        assert_eq!(registry.owner_of(Section::Indexes), Some("indexing"));
    }

    #[test]
    fn test_unknown_analyzer() {
        let registry = AnalyzerRegistry::with_defaults();
        assert!(matches!(
            registry.get("lineage"),
            Err(AnalysisError::UnknownAnalyzer { .. })
        ));

        let mut dag = AnalyzerDag::with_defaults();
        dag.add_dependency("lineage", "schema").unwrap();
        assert!(registry.check_dag(&dag).is_err());
    }
}
