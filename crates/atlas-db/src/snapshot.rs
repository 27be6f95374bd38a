//! JSON catalog snapshot provider
//!
//! Serves a server's catalogs from a captured JSON document instead of a
//! live engine. Useful for offline analysis of exported metadata and as a
//! deterministic fixture.

use crate::connection::ConnectionTarget;
use crate::error::{DbError, DbResult};
use crate::traits::{CatalogProvider, ProviderFactory, QueryRow};
use async_trait::async_trait;
use atlas_core::catalog::{
    CatalogDependency, DatabaseEntry, MissingIndexCandidate, RoutineUsageStats, TableRowCount,
    TableUsageStats,
};
use atlas_core::{
    ColumnInfo, ColumnProfile, ForeignKey, IndexDefinition, IndexUsage, JobInfo, ProviderType,
    RoutineInfo, SequenceInfo, SynonymInfo, TriggerInfo, UserTypeInfo, ViewInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Catalog content of one database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
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
    pub dependencies: Vec<CatalogDependency>,
    #[serde(default)]
    pub row_counts: Vec<TableRowCount>,
    /// Column statistics keyed by `schema.table`
    #[serde(default)]
    pub profiles: BTreeMap<String, Vec<ColumnProfile>>,
    #[serde(default)]
    pub missing_indexes: Vec<MissingIndexCandidate>,

    /// Telemetry; `None` means the capturing account lacked permission
    #[serde(default)]
    pub index_usage: Option<Vec<IndexUsage>>,
    #[serde(default)]
    pub table_usage: Option<Vec<TableUsageStats>>,
    #[serde(default)]
    pub routine_usage: Option<Vec<RoutineUsageStats>>,
}

/// One database on a captured server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub name: String,
    #[serde(default = "default_true")]
    pub online: bool,
    #[serde(default)]
    pub is_system: bool,
    /// When set, connecting to this database fails with this message
    #[serde(default)]
    pub connect_error: Option<String>,
    #[serde(default)]
    pub catalog: CatalogSnapshot,
}

fn default_true() -> bool {
    true
}

impl DatabaseSnapshot {
    pub fn new(name: impl Into<String>, catalog: CatalogSnapshot) -> Self {
        Self {
            name: name.into(),
            online: true,
            is_system: false,
            connect_error: None,
            catalog,
        }
    }
}

/// A captured server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub server_name: String,
    #[serde(default)]
    pub databases: Vec<DatabaseSnapshot>,
}

impl ServerSnapshot {
    pub fn load(path: &Path) -> DbResult<Self> {
        if !path.is_file() {
            return Err(DbError::ConnectionError(format!(
                "snapshot file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseSnapshot> {
        self.databases
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

/// Provider over one database of a snapshot, or its administrative view
pub struct SnapshotProvider {
    server: Arc<ServerSnapshot>,
    database: Option<String>,
    catalog: CatalogSnapshot,
}

impl SnapshotProvider {
    fn telemetry<T: Clone>(&self, data: &Option<Vec<T>>, what: &str) -> DbResult<Vec<T>> {
        data.clone().ok_or_else(|| {
            DbError::PermissionDenied(format!(
                "{} is not available in snapshot of {}",
                what, self.server.server_name
            ))
        })
    }
}

#[async_trait]
impl CatalogProvider for SnapshotProvider {
    fn engine(&self) -> &'static str {
        "snapshot"
    }

    fn server_name(&self) -> &str {
        &self.server.server_name
    }

    fn database_name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    async fn execute_query(&self, _sql: &str) -> DbResult<Vec<QueryRow>> {
        Err(DbError::not_supported(self.engine(), "ad-hoc queries"))
    }

    async fn execute_scalar(&self, _sql: &str) -> DbResult<Option<serde_json::Value>> {
        Err(DbError::not_supported(self.engine(), "ad-hoc queries"))
    }

    async fn enumerate_databases(&self) -> DbResult<Vec<DatabaseEntry>> {
        Ok(self
            .server
            .databases
            .iter()
            .map(|d| DatabaseEntry {
                name: d.name.clone(),
                is_online: d.online,
                is_system: d.is_system,
            })
            .collect())
    }

    async fn columns(&self) -> DbResult<Vec<ColumnInfo>> {
        Ok(self.catalog.columns.clone())
    }

    async fn foreign_keys(&self) -> DbResult<Vec<ForeignKey>> {
        Ok(self.catalog.foreign_keys.clone())
    }

    async fn index_catalog(&self) -> DbResult<Vec<IndexDefinition>> {
        Ok(self.catalog.indexes.clone())
    }

    async fn index_usage(&self) -> DbResult<Vec<IndexUsage>> {
        self.telemetry(&self.catalog.index_usage, "index usage")
    }

    async fn missing_indexes(&self) -> DbResult<Vec<MissingIndexCandidate>> {
        Ok(self.catalog.missing_indexes.clone())
    }

    async fn views(&self) -> DbResult<Vec<ViewInfo>> {
        Ok(self.catalog.views.clone())
    }

    async fn procedures(&self) -> DbResult<Vec<RoutineInfo>> {
        Ok(self.catalog.procedures.clone())
    }

    async fn functions(&self) -> DbResult<Vec<RoutineInfo>> {
        Ok(self.catalog.functions.clone())
    }

    async fn triggers(&self) -> DbResult<Vec<TriggerInfo>> {
        Ok(self.catalog.triggers.clone())
    }

    async fn synonyms(&self) -> DbResult<Vec<SynonymInfo>> {
        Ok(self.catalog.synonyms.clone())
    }

    async fn sequences(&self) -> DbResult<Vec<SequenceInfo>> {
        Ok(self.catalog.sequences.clone())
    }

    async fn user_types(&self) -> DbResult<Vec<UserTypeInfo>> {
        Ok(self.catalog.user_types.clone())
    }

    async fn jobs(&self) -> DbResult<Vec<JobInfo>> {
        Ok(self.catalog.jobs.clone())
    }

    async fn object_dependencies(&self) -> DbResult<Vec<CatalogDependency>> {
        Ok(self.catalog.dependencies.clone())
    }

    async fn table_row_counts(&self) -> DbResult<Vec<TableRowCount>> {
        Ok(self.catalog.row_counts.clone())
    }

    async fn profile_table(&self, schema: &str, table: &str) -> DbResult<Vec<ColumnProfile>> {
        let key = format!("{}.{}", schema, table);
        Ok(self
            .catalog
            .profiles
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
            .map(|(_, v)| v.clone())
            .unwrap_or_default())
    }

    async fn table_usage_stats(&self) -> DbResult<Vec<TableUsageStats>> {
        self.telemetry(&self.catalog.table_usage, "table usage")
    }

    async fn routine_usage_stats(&self) -> DbResult<Vec<RoutineUsageStats>> {
        self.telemetry(&self.catalog.routine_usage, "routine usage")
    }
}

/// Opens snapshot providers
///
/// With a preloaded snapshot every target is served from it; otherwise
/// the target's `server` names the JSON file to read.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFactory {
    preloaded: Option<Arc<ServerSnapshot>>,
}

impl SnapshotFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ServerSnapshot) -> Self {
        Self {
            preloaded: Some(Arc::new(snapshot)),
        }
    }

    fn snapshot_for(&self, target: &ConnectionTarget) -> DbResult<Arc<ServerSnapshot>> {
        match &self.preloaded {
            Some(snapshot) => Ok(Arc::clone(snapshot)),
            None => Ok(Arc::new(ServerSnapshot::load(Path::new(&target.server))?)),
        }
    }
}

#[async_trait]
impl ProviderFactory for SnapshotFactory {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Snapshot
    }

    async fn connect(&self, target: &ConnectionTarget) -> DbResult<Arc<dyn CatalogProvider>> {
        let server = self.snapshot_for(target)?;

        let catalog = match &target.database {
            None => CatalogSnapshot::default(),
            Some(name) => {
                let db = server.database(name).ok_or_else(|| {
                    DbError::ConnectionError(format!(
                        "database '{}' not found on {}",
                        name, server.server_name
                    ))
                })?;
                if let Some(message) = &db.connect_error {
                    return Err(DbError::ConnectionError(message.clone()));
                }
                db.catalog.clone()
            }
        };

        Ok(Arc::new(SnapshotProvider {
            database: target.database.clone(),
            server,
            catalog,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture() -> ServerSnapshot {
        let mut offline = DatabaseSnapshot::new("Archive", CatalogSnapshot::default());
        offline.online = false;
        let mut broken = DatabaseSnapshot::new("Broken", CatalogSnapshot::default());
        broken.connect_error = Some("login failed".into());

        let catalog = CatalogSnapshot {
            row_counts: vec![TableRowCount {
                schema: "dbo".into(),
                table: "Orders".into(),
                row_count: 12,
            }],
            table_usage: Some(vec![]),
            ..Default::default()
        };

        ServerSnapshot {
            server_name: "sql01".into(),
            databases: vec![DatabaseSnapshot::new("Sales", catalog), offline, broken],
        }
    }

    #[tokio::test]
    async fn test_admin_connection_enumerates() {
        let factory = SnapshotFactory::from_snapshot(fixture());
        let admin = factory
            .connect(&ConnectionTarget::parse("server=sql01").unwrap())
            .await
            .unwrap();
        let dbs = admin.enumerate_databases().await.unwrap();
        assert_eq!(dbs.len(), 3);
        assert!(!dbs[1].is_online);
        assert_eq!(admin.server_name(), "sql01");
    }

    #[tokio::test]
    async fn test_database_connection() {
        let factory = SnapshotFactory::from_snapshot(fixture());
        let target = ConnectionTarget::parse("server=sql01;database=sales").unwrap();
        let sales = factory.connect(&target).await.unwrap();
        assert_eq!(sales.table_row_counts().await.unwrap()[0].row_count, 12);
        assert!(sales.table_usage_stats().await.unwrap().is_empty());
        assert!(matches!(
            sales.index_usage().await.unwrap_err(),
            DbError::PermissionDenied(_)
        ));
    }

    #[tokio::test]
    async fn test_connect_errors() {
        let factory = SnapshotFactory::from_snapshot(fixture());
        let broken = ConnectionTarget::parse("server=sql01;database=Broken").unwrap();
        let err = factory.connect(&broken).await.err().unwrap();
        assert!(err.to_string().contains("login failed"));

        let missing = ConnectionTarget::parse("server=sql01;database=Nope").unwrap();
        assert!(factory.connect(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&fixture()).unwrap()).unwrap();

        let target = ConnectionTarget::parse(&format!(
            "server={};database=Sales",
            file.path().display()
        ))
        .unwrap();
        let sales = SnapshotFactory::new().connect(&target).await.unwrap();
        assert_eq!(sales.database_name(), Some("Sales"));
    }
}
