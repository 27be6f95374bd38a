//! The per-run analysis aggregate and its independently nullable sections
//!
//! A section being present (`Some`) is the signal that its analyzer has run.

pub mod indexing;
pub mod merge;
pub mod profile;
pub mod quality;
pub mod relationships;
pub mod schema;
pub mod usage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::sql_utils::qualify_name;
use indexing::{IndexAnalysis, IndexRecommendation, IndexUsage};
use profile::TableProfile;
use quality::QualityIssue;
use relationships::{DependencyNode, ImplicitRelationship, ObjectDependency, RelationshipGraph};
use schema::{
    ColumnInfo, ForeignKey, IndexDefinition, JobInfo, RoutineInfo, SchemaInventory, SequenceInfo,
    SynonymInfo, TableInfo, TriggerInfo, UserTypeInfo, ViewInfo,
};
use usage::{ObjectUsage, UsageAnalysis};

/// Identifies one result section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Schema,
    Profiles,
    Relationships,
    Quality,
    Usage,
    Indexes,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Schema,
        Section::Profiles,
        Section::Relationships,
        Section::Quality,
        Section::Usage,
        Section::Indexes,
    ];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Section::Schema => "schema",
            Section::Profiles => "profiles",
            Section::Relationships => "relationships",
            Section::Quality => "quality",
            Section::Usage => "usage",
            Section::Indexes => "indexes",
        };
        f.write_str(s)
    }
}

/// The payload of one section, as produced by a single analyzer
#[derive(Debug, Clone, PartialEq)]
pub enum SectionData {
    Schema(SchemaInventory),
    Profiles(Vec<TableProfile>),
    Relationships(RelationshipGraph),
    Quality(Vec<QualityIssue>),
    Usage(UsageAnalysis),
    Indexes(IndexAnalysis),
}

impl SectionData {
    pub fn section(&self) -> Section {
        match self {
            SectionData::Schema(_) => Section::Schema,
            SectionData::Profiles(_) => Section::Profiles,
            SectionData::Relationships(_) => Section::Relationships,
            SectionData::Quality(_) => Section::Quality,
            SectionData::Usage(_) => Section::Usage,
            SectionData::Indexes(_) => Section::Indexes,
        }
    }
}

/// A database that could not be analyzed during fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseFailure {
    pub database: String,
    pub error: String,
}

/// Aggregate result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Database name, or server name in server mode
    pub target: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaInventory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<TableProfile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<RelationshipGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_issues: Option<Vec<QualityIssue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<IndexAnalysis>,
    #[serde(default)]
    pub server_mode: bool,
    /// Databases successfully analyzed (server mode)
    #[serde(default)]
    pub databases: Vec<String>,
    #[serde(default)]
    pub failed_databases: Vec<DatabaseFailure>,
    /// Sections each database has completed (server mode), keyed by
    /// lowercased database name. A completed section may hold no rows.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub completed: BTreeMap<String, BTreeSet<Section>>,
}

impl AnalysisResult {
    /// Empty result for a single database
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            target: database.into(),
            generated_at: Utc::now(),
            schema: None,
            profiles: None,
            relationships: None,
            quality_issues: None,
            usage: None,
            indexes: None,
            server_mode: false,
            databases: Vec::new(),
            failed_databases: Vec::new(),
            completed: BTreeMap::new(),
        }
    }

    /// Empty aggregate for a whole server
    pub fn for_server(server: impl Into<String>) -> Self {
        let mut result = Self::for_database(server);
        result.server_mode = true;
        result
    }

    pub fn has_section(&self, section: Section) -> bool {
        match section {
            Section::Schema => self.schema.is_some(),
            Section::Profiles => self.profiles.is_some(),
            Section::Relationships => self.relationships.is_some(),
            Section::Quality => self.quality_issues.is_some(),
            Section::Usage => self.usage.is_some(),
            Section::Indexes => self.indexes.is_some(),
        }
    }

    /// Drop a section and every database's completion of it
    pub fn clear_section(&mut self, section: Section) {
        self.take_section(section);
        self.completed.retain(|_, done| {
            done.remove(&section);
            !done.is_empty()
        });
    }

    /// Remove and return a section
    pub fn take_section(&mut self, section: Section) -> Option<SectionData> {
        match section {
            Section::Schema => self.schema.take().map(SectionData::Schema),
            Section::Profiles => self.profiles.take().map(SectionData::Profiles),
            Section::Relationships => self.relationships.take().map(SectionData::Relationships),
            Section::Quality => self.quality_issues.take().map(SectionData::Quality),
            Section::Usage => self.usage.take().map(SectionData::Usage),
            Section::Indexes => self.indexes.take().map(SectionData::Indexes),
        }
    }

    /// Store a section, replacing any previous value
    pub fn put_section(&mut self, data: SectionData) {
        match data {
            SectionData::Schema(v) => self.schema = Some(v),
            SectionData::Profiles(v) => self.profiles = Some(v),
            SectionData::Relationships(v) => self.relationships = Some(v),
            SectionData::Quality(v) => self.quality_issues = Some(v),
            SectionData::Usage(v) => self.usage = Some(v),
            SectionData::Indexes(v) => self.indexes = Some(v),
        }
    }

    /// Sections currently present
    pub fn sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| self.has_section(*s))
            .collect()
    }

    /// Record that `section` was produced for `database`
    pub fn mark_completed(&mut self, database: &str, section: Section) {
        self.completed
            .entry(database.to_lowercase())
            .or_default()
            .insert(section);
    }

    pub fn is_completed(&self, database: &str, section: Section) -> bool {
        self.completed
            .get(&database.to_lowercase())
            .is_some_and(|s| s.contains(&section))
    }

    /// Forget `sections` for `database`
    pub fn forget_completed(&mut self, database: &str, sections: &[Section]) {
        let key = database.to_lowercase();
        if let Some(done) = self.completed.get_mut(&key) {
            for section in sections {
                done.remove(section);
            }
            if done.is_empty() {
                self.completed.remove(&key);
            }
        }
    }

    /// Whether a database was analyzed successfully in this run
    pub fn analyzed(&self, database: &str) -> bool {
        self.databases
            .iter()
            .any(|d| d.eq_ignore_ascii_case(database))
    }
}

/// A row that can be attributed to one database
pub trait DatabaseScoped {
    fn database(&self) -> Option<&str>;
    fn set_database(&mut self, database: &str);

    fn belongs_to(&self, database: &str) -> bool {
        self.database()
            .is_some_and(|d| d.eq_ignore_ascii_case(database))
    }
}

macro_rules! impl_database_scoped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DatabaseScoped for $ty {
                fn database(&self) -> Option<&str> {
                    self.database.as_deref()
                }

                fn set_database(&mut self, database: &str) {
                    self.database = Some(database.to_string());
                }
            }
        )*
    };
}

impl_database_scoped!(
    ColumnInfo,
    ForeignKey,
    IndexDefinition,
    JobInfo,
    RoutineInfo,
    SequenceInfo,
    SynonymInfo,
    TriggerInfo,
    UserTypeInfo,
    TableProfile,
    ImplicitRelationship,
    QualityIssue,
    ObjectUsage,
    IndexRecommendation,
);

impl DatabaseScoped for TableInfo {
    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn set_database(&mut self, database: &str) {
        self.database = Some(database.to_string());
        stamp_rows(&mut self.columns, database);
    }
}

impl DatabaseScoped for ViewInfo {
    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn set_database(&mut self, database: &str) {
        self.database = Some(database.to_string());
        stamp_rows(&mut self.columns, database);
    }
}

impl DatabaseScoped for IndexUsage {
    fn database(&self) -> Option<&str> {
        self.index.database.as_deref()
    }

    fn set_database(&mut self, database: &str) {
        self.index.database = Some(database.to_string());
    }
}

impl DatabaseScoped for ObjectDependency {
    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn set_database(&mut self, database: &str) {
        self.database = Some(database.to_string());
        if self.to_database.is_none() {
            self.to_database = Some(database.to_string());
        }
    }
}

impl DatabaseScoped for DependencyNode {
    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Stamps the node and rewrites every two-part key it holds to three parts
    fn set_database(&mut self, database: &str) {
        self.database = Some(database.to_string());
        self.key = qualify_name(&self.key, database);
        self.depends_on = self
            .depends_on
            .iter()
            .map(|k| qualify_name(k, database))
            .collect();
        self.referenced_by = self
            .referenced_by
            .iter()
            .map(|k| qualify_name(k, database))
            .collect();
        self.transitive_impact = self
            .transitive_impact
            .iter()
            .map(|k| qualify_name(k, database))
            .collect();
    }
}

pub(crate) fn stamp_rows<T: DatabaseScoped>(rows: &mut [T], database: &str) {
    for row in rows {
        row.set_database(database);
    }
}

#[cfg(test)]
#[path = "result_test.rs"]
mod tests;
