//! atlas-analysis: analyzers that turn catalog data into report sections
//!
//! Each analyzer owns one section of the result and reads the sections it
//! depends on from the prior result. The relationships analyzer hosts the
//! dependency graph builder; usage scoring and index advice live in their
//! own modules.

pub mod analyzer;
pub mod context;
pub(crate) mod error;
pub mod indexing;
pub mod profiling;
pub mod quality;
pub mod relationships;
pub mod schema;
pub mod types;
pub mod usage;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use analyzer::{Analyzer, AnalyzerRegistry};
pub use context::AnalysisContext;
pub use error::{AnalysisError, AnalyzeResult};
pub use indexing::IndexingAnalyzer;
pub use profiling::ProfilingAnalyzer;
pub use quality::{check_quality, QualityAnalyzer};
pub use relationships::{
    dependency_cycles, detect_implicit, DependencyGraphBuilder, RelationshipsAnalyzer,
};
pub use schema::SchemaAnalyzer;
pub use types::{types_compatible, TypeFamily};
pub use usage::{Observation, UsageAnalyzer, UsageScoringEngine, UsageSignal};
