//! Schema inventory: the catalog objects of one or more databases

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of schema object tracked in results and graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    Table,
    View,
    Procedure,
    Function,
    Trigger,
    Synonym,
    Job,
    /// Placeholder for an object that lives outside the analyzed database
    External,
}

impl ObjectType {
    /// Parse a loose engine-reported type name (e.g. `"USER_TABLE"`, `"P"`).
    pub fn from_catalog(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" | "u" | "user_table" | "base table" => Some(Self::Table),
            "view" | "v" => Some(Self::View),
            "procedure" | "p" | "sql_stored_procedure" => Some(Self::Procedure),
            "function" | "fn" | "if" | "tf" | "macro" | "sql_scalar_function"
            | "sql_inline_table_valued_function" | "sql_table_valued_function" => {
                Some(Self::Function)
            }
            "trigger" | "tr" | "sql_trigger" => Some(Self::Trigger),
            "synonym" | "sn" => Some(Self::Synonym),
            "job" => Some(Self::Job),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectType::Table => "table",
            ObjectType::View => "view",
            ObjectType::Procedure => "procedure",
            ObjectType::Function => "function",
            ObjectType::Trigger => "trigger",
            ObjectType::Synonym => "synonym",
            ObjectType::Job => "job",
            ObjectType::External => "external",
        };
        f.write_str(s)
    }
}

/// One column of a table or view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub table: String,
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub ordinal: i32,
}

/// A base table with its columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    /// Primary-key column names in ordinal order
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Look up a column case-insensitively
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// A view with its defining text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

/// A stored procedure or function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub definition: Option<String>,
}

/// A trigger attached to a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
    pub parent_table: String,
    #[serde(default)]
    pub definition: Option<String>,
}

/// A synonym and the object it aliases (possibly multi-part)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
    pub base_object: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTypeInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub base_type: Option<String>,
}

/// One step of a scheduled job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStep {
    pub name: String,
    /// Database the step runs in, when the engine records one
    #[serde(default)]
    pub database: Option<String>,
    pub command: String,
}

/// A server-level scheduled job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    #[serde(default)]
    pub database: Option<String>,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub steps: Vec<JobStep>,
}

fn default_true() -> bool {
    true
}

/// A declared foreign-key column pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub from_schema: String,
    pub from_table: String,
    pub from_column: String,
    pub to_schema: String,
    pub to_table: String,
    pub to_column: String,
}

/// Catalog definition of an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    #[serde(default)]
    pub database: Option<String>,
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Ordered key columns
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub included_columns: Vec<String>,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_clustered: bool,
}

/// Every catalog object discovered by the schema analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInventory {
    #[serde(default)]
    pub tables: Vec<TableInfo>,
    #[serde(default)]
    pub views: Vec<ViewInfo>,
    #[serde(default)]
    pub procedures: Vec<RoutineInfo>,
    #[serde(default)]
    pub functions: Vec<RoutineInfo>,
    #[serde(default)]
    pub triggers: Vec<TriggerInfo>,
    #[serde(default)]
    pub synonyms: Vec<SynonymInfo>,
    #[serde(default)]
    pub sequences: Vec<SequenceInfo>,
    #[serde(default)]
    pub user_types: Vec<UserTypeInfo>,
    #[serde(default)]
    pub jobs: Vec<JobInfo>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

impl SchemaInventory {
    /// Find a table by schema and name, case-insensitively
    pub fn table(&self, schema: &str, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| {
            t.schema.eq_ignore_ascii_case(schema) && t.name.eq_ignore_ascii_case(name)
        })
    }

    /// Total object count across every object kind
    pub fn object_count(&self) -> usize {
        self.tables.len()
            + self.views.len()
            + self.procedures.len()
            + self.functions.len()
            + self.triggers.len()
            + self.synonyms.len()
            + self.jobs.len()
    }
}
