//! atlas-core - Core library for dbatlas
//!
//! This crate provides the analysis result model, catalog row shapes, the
//! analyzer dependency DAG, configuration parsing and the merge rules used
//! to combine per-database fragments.

pub mod catalog;
pub mod config;
pub mod dag;
pub mod error;
pub mod result;
pub mod sql_utils;

pub use config::{Config, ProviderType};
pub use dag::AnalyzerDag;
pub use error::{CoreError, CoreResult};
pub use result::indexing::{
    IndexAnalysis, IndexRecommendation, IndexUsage, RecommendationKind, RecommendationSeverity,
};
pub use result::merge::SectionRows;
pub use result::profile::{ColumnProfile, TableProfile};
pub use result::quality::{QualityIssue, Severity};
pub use result::relationships::{
    DependencyNode, DependencySource, ImplicitRelationship, ObjectDependency, RelationshipGraph,
};
pub use result::schema::{
    ColumnInfo, ForeignKey, IndexDefinition, JobInfo, JobStep, ObjectType, RoutineInfo,
    SchemaInventory, SequenceInfo, SynonymInfo, TableInfo, TriggerInfo, UserTypeInfo, ViewInfo,
};
pub use result::usage::{ObjectUsage, UsageAnalysis, UsageClass};
pub use result::{AnalysisResult, DatabaseFailure, DatabaseScoped, Section, SectionData};
