//! Provider trait definitions
//!
//! A provider is one open connection to one database (or to a server's
//! administrative database). Catalog queries return engine-agnostic rows;
//! optional queries default to an empty result, telemetry queries default
//! to `NotSupported` so callers can fall back.

use crate::connection::ConnectionTarget;
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use atlas_core::catalog::{
    CatalogDependency, DatabaseEntry, MissingIndexCandidate, RoutineUsageStats, TableRowCount,
    TableUsageStats,
};
use atlas_core::{
    ColumnInfo, ColumnProfile, ForeignKey, IndexDefinition, IndexUsage, JobInfo, ProviderType,
    RoutineInfo, SequenceInfo, SynonymInfo, TriggerInfo, UserTypeInfo, ViewInfo,
};
use std::sync::Arc;

/// One generic query row, keyed by column name
pub type QueryRow = serde_json::Map<String, serde_json::Value>;

/// Catalog access for one open connection
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Engine identifier for logging
    fn engine(&self) -> &'static str;

    /// Name of the server this connection belongs to
    fn server_name(&self) -> &str;

    /// Database this connection is scoped to, `None` for an administrative connection
    fn database_name(&self) -> Option<&str>;

    /// Execute a query and return every row
    async fn execute_query(&self, sql: &str) -> DbResult<Vec<QueryRow>>;

    /// Execute a query and return the first column of the first row
    async fn execute_scalar(&self, sql: &str) -> DbResult<Option<serde_json::Value>>;

    /// User and system databases visible on the server
    async fn enumerate_databases(&self) -> DbResult<Vec<DatabaseEntry>>;

    /// Columns of every table and view
    async fn columns(&self) -> DbResult<Vec<ColumnInfo>>;

    /// Declared foreign keys, one row per column pair
    async fn foreign_keys(&self) -> DbResult<Vec<ForeignKey>>;

    /// Index definitions without usage counters
    async fn index_catalog(&self) -> DbResult<Vec<IndexDefinition>>;

    /// Index definitions joined with usage counters
    async fn index_usage(&self) -> DbResult<Vec<IndexUsage>> {
        Err(DbError::not_supported(self.engine(), "index usage telemetry"))
    }

    /// Engine-reported missing-index suggestions
    async fn missing_indexes(&self) -> DbResult<Vec<MissingIndexCandidate>> {
        Ok(Vec::new())
    }

    async fn views(&self) -> DbResult<Vec<ViewInfo>>;

    async fn procedures(&self) -> DbResult<Vec<RoutineInfo>> {
        Ok(Vec::new())
    }

    async fn functions(&self) -> DbResult<Vec<RoutineInfo>> {
        Ok(Vec::new())
    }

    async fn triggers(&self) -> DbResult<Vec<TriggerInfo>> {
        Ok(Vec::new())
    }

    async fn synonyms(&self) -> DbResult<Vec<SynonymInfo>> {
        Ok(Vec::new())
    }

    async fn sequences(&self) -> DbResult<Vec<SequenceInfo>> {
        Ok(Vec::new())
    }

    async fn user_types(&self) -> DbResult<Vec<UserTypeInfo>> {
        Ok(Vec::new())
    }

    /// Scheduled jobs with their step text
    async fn jobs(&self) -> DbResult<Vec<JobInfo>> {
        Ok(Vec::new())
    }

    /// The engine's native object-dependency catalog
    async fn object_dependencies(&self) -> DbResult<Vec<CatalogDependency>> {
        Ok(Vec::new())
    }

    /// Row counts for every table
    async fn table_row_counts(&self) -> DbResult<Vec<TableRowCount>>;

    /// Column statistics for one table
    async fn profile_table(&self, _schema: &str, _table: &str) -> DbResult<Vec<ColumnProfile>> {
        Ok(Vec::new())
    }

    /// Read/write telemetry per table
    async fn table_usage_stats(&self) -> DbResult<Vec<TableUsageStats>> {
        Err(DbError::not_supported(self.engine(), "table usage telemetry"))
    }

    /// Execution telemetry per procedure/function
    async fn routine_usage_stats(&self) -> DbResult<Vec<RoutineUsageStats>> {
        Err(DbError::not_supported(self.engine(), "routine usage telemetry"))
    }
}

/// Opens provider connections
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Normalize a parsed target before the session decides its mode.
    ///
    /// Engines whose connection strings can name a single database
    /// without a `database` key override this.
    fn resolve_target(&self, target: ConnectionTarget) -> DbResult<ConnectionTarget> {
        Ok(target)
    }

    /// Open a connection scoped to `target` (its database, or the server
    /// when the target has none)
    async fn connect(&self, target: &ConnectionTarget) -> DbResult<Arc<dyn CatalogProvider>>;
}
