//! DuckDB catalog provider
//!
//! A DuckDB "server" is a directory of database files (`*.duckdb` or
//! `*.db`); each file is one database named after its stem. The
//! administrative connection is an in-memory connection that enumerates
//! the directory.

use crate::connection::ConnectionTarget;
use crate::error::{DbError, DbResult};
use crate::traits::{CatalogProvider, ProviderFactory, QueryRow};
use async_trait::async_trait;
use atlas_core::catalog::{DatabaseEntry, TableRowCount};
use atlas_core::sql_utils::quote_qualified;
use atlas_core::{
    ColumnInfo, ColumnProfile, ForeignKey, IndexDefinition, ProviderType, RoutineInfo,
    SequenceInfo, UserTypeInfo, ViewInfo,
};
use duckdb::Connection;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const DATABASE_EXTENSIONS: &[&str] = &["duckdb", "db"];

/// DuckDB provider for one database file or the administrative connection
pub struct DuckDbProvider {
    conn: Mutex<Connection>,
    server_name: String,
    database_name: Option<String>,
    server_dir: Option<PathBuf>,
}

impl DuckDbProvider {
    /// Open one database file
    pub fn open_database(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        let server_dir = path.parent().map(Path::to_path_buf);
        Ok(Self {
            conn: Mutex::new(conn),
            server_name: server_label(server_dir.as_deref()),
            database_name: file_stem(path),
            server_dir,
        })
    }

    /// Open the administrative connection for a server directory
    pub fn open_server(dir: &Path) -> DbResult<Self> {
        if !dir.is_dir() {
            return Err(DbError::ConnectionError(format!(
                "server directory not found: {}",
                dir.display()
            )));
        }
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            server_name: server_label(Some(dir)),
            database_name: None,
            server_dir: Some(dir.to_path_buf()),
        })
    }

    /// In-memory database, mostly for tests and scratch work
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            server_name: "memory".to_string(),
            database_name: Some("memory".to_string()),
            server_dir: None,
        })
    }

    /// Run a batch of statements, e.g. to seed fixtures
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Run `sql` and return each row as a JSON object.
    ///
    /// DuckDB serializes the row struct itself, so no per-type value
    /// conversion is needed on this side.
    fn query_rows_sync(&self, sql: &str) -> DbResult<Vec<QueryRow>> {
        let inner = sql.trim().trim_end_matches(';');
        let wrapped = format!("SELECT CAST(to_json(q) AS VARCHAR) FROM ({}) AS q", inner);
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&wrapped)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, inner)))?;
        let texts = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(texts.len());
        for text in texts.into_iter().flatten() {
            match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => rows.push(map),
                other => {
                    let mut map = QueryRow::new();
                    map.insert("value".to_string(), other);
                    rows.push(map);
                }
            }
        }
        Ok(rows)
    }

    fn query_scalar_sync(&self, sql: &str) -> DbResult<Option<Value>> {
        let inner = sql.trim().trim_end_matches(';');
        let wrapped = format!(
            "SELECT CAST(to_json(first_col) AS VARCHAR) FROM ({}) AS q(first_col) LIMIT 1",
            inner
        );
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&wrapped)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, inner)))?;
        let mut rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;
        match rows.next() {
            Some(text) => match text? {
                Some(text) => Ok(Some(serde_json::from_str(&text)?)),
                None => Ok(Some(Value::Null)),
            },
            None => Ok(None),
        }
    }

    fn query_as<T: DeserializeOwned>(&self, sql: &str) -> DbResult<Vec<T>> {
        self.query_rows_sync(sql)?
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(DbError::from))
            .collect()
    }

    fn database_files(dir: &Path) -> DbResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DATABASE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if path.is_file() && matches {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

fn server_label(dir: Option<&Path>) -> String {
    dir.and_then(|d| d.file_name())
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("local")
        .to_string()
}

/// Locate the file backing `database` in a server directory
fn database_path(dir: &Path, database: &str) -> Option<PathBuf> {
    DATABASE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", database, ext)))
        .find(|p| p.is_file())
        .or_else(|| {
            // case-insensitive fallback
            DuckDbProvider::database_files(dir).ok()?.into_iter().find(|p| {
                file_stem(p).is_some_and(|s| s.eq_ignore_ascii_case(database))
            })
        })
}

#[derive(Deserialize)]
struct IndexRow {
    schema: String,
    table: String,
    name: String,
    #[serde(default)]
    expressions: Option<String>,
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default)]
    is_unique: bool,
    #[serde(default)]
    is_primary_key: bool,
}

/// Parse DuckDB's `expressions` text (`[a, "b"]`) into column names
fn parse_index_expressions(text: &str) -> Vec<String> {
    text.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('\'').trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Deserialize)]
struct ProfileRow {
    column: String,
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default)]
    null_fraction: Option<f64>,
    #[serde(default)]
    distinct_count: Option<i64>,
}

#[async_trait]
impl CatalogProvider for DuckDbProvider {
    fn engine(&self) -> &'static str {
        "duckdb"
    }

    fn server_name(&self) -> &str {
        &self.server_name
    }

    fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    async fn execute_query(&self, sql: &str) -> DbResult<Vec<QueryRow>> {
        self.query_rows_sync(sql)
    }

    async fn execute_scalar(&self, sql: &str) -> DbResult<Option<Value>> {
        self.query_scalar_sync(sql)
    }

    async fn enumerate_databases(&self) -> DbResult<Vec<DatabaseEntry>> {
        if let (None, Some(dir)) = (&self.database_name, &self.server_dir) {
            return Ok(Self::database_files(dir)?
                .iter()
                .filter_map(|p| file_stem(p))
                .map(DatabaseEntry::online)
                .collect());
        }
        self.query_as(
            "SELECT database_name AS name, true AS is_online, internal AS is_system \
             FROM duckdb_databases() ORDER BY database_name",
        )
    }

    async fn columns(&self) -> DbResult<Vec<ColumnInfo>> {
        self.query_as(
            r#"SELECT c.table_schema AS schema, c.table_name AS "table", c.column_name AS name,
                c.data_type AS data_type, c.is_nullable = 'YES' AS is_nullable,
                EXISTS (
                    SELECT 1 FROM duckdb_constraints() k
                    WHERE k.constraint_type = 'PRIMARY KEY'
                      AND k.database_name = c.table_catalog
                      AND k.schema_name = c.table_schema
                      AND k.table_name = c.table_name
                      AND list_contains(k.constraint_column_names, c.column_name)
                ) AS is_primary_key,
                CAST(c.ordinal_position AS INTEGER) AS ordinal
            FROM information_schema.columns c
            WHERE c.table_catalog = current_database()
            ORDER BY c.table_schema, c.table_name, c.ordinal_position"#,
        )
    }

    async fn foreign_keys(&self) -> DbResult<Vec<ForeignKey>> {
        self.query_as(
            "SELECT constraint_name AS name, schema_name AS from_schema, table_name AS from_table, \
                unnest(constraint_column_names) AS from_column, schema_name AS to_schema, \
                referenced_table AS to_table, unnest(referenced_column_names) AS to_column \
             FROM duckdb_constraints() \
             WHERE constraint_type = 'FOREIGN KEY' AND database_name = current_database()",
        )
    }

    async fn index_catalog(&self) -> DbResult<Vec<IndexDefinition>> {
        let explicit: Vec<IndexRow> = self.query_as(
            r#"SELECT schema_name AS schema, table_name AS "table", index_name AS name,
                expressions, is_unique, is_primary AS is_primary_key
            FROM duckdb_indexes()
            WHERE database_name = current_database()"#,
        )?;
        let constraints: Vec<IndexRow> = self.query_as(
            r#"SELECT schema_name AS schema, table_name AS "table",
                lower(replace(constraint_type, ' ', '_')) || '_' || table_name AS name,
                constraint_column_names AS columns, true AS is_unique,
                constraint_type = 'PRIMARY KEY' AS is_primary_key
            FROM duckdb_constraints()
            WHERE constraint_type IN ('PRIMARY KEY', 'UNIQUE')
              AND database_name = current_database()"#,
        )?;

        Ok(explicit
            .into_iter()
            .chain(constraints)
            .map(|row| {
                let columns = match (row.columns, row.expressions) {
                    (Some(cols), _) => cols,
                    (None, Some(expr)) => parse_index_expressions(&expr),
                    (None, None) => Vec::new(),
                };
                IndexDefinition {
                    database: None,
                    schema: row.schema,
                    table: row.table,
                    name: row.name,
                    columns,
                    included_columns: Vec::new(),
                    is_unique: row.is_unique,
                    is_primary_key: row.is_primary_key,
                    is_clustered: false,
                }
            })
            .collect())
    }

    async fn views(&self) -> DbResult<Vec<ViewInfo>> {
        self.query_as(
            "SELECT schema_name AS schema, view_name AS name, sql AS definition \
             FROM duckdb_views() \
             WHERE NOT internal AND database_name = current_database() \
             ORDER BY schema_name, view_name",
        )
    }

    /// Macros are DuckDB's closest analogue of user functions
    async fn functions(&self) -> DbResult<Vec<RoutineInfo>> {
        self.query_as(
            "SELECT DISTINCT schema_name AS schema, function_name AS name, \
                macro_definition AS definition \
             FROM duckdb_functions() \
             WHERE NOT internal AND function_type IN ('macro', 'table_macro') \
               AND database_name = current_database() \
             ORDER BY schema, name",
        )
    }

    async fn sequences(&self) -> DbResult<Vec<SequenceInfo>> {
        self.query_as(
            "SELECT schema_name AS schema, sequence_name AS name \
             FROM duckdb_sequences() WHERE database_name = current_database()",
        )
    }

    async fn user_types(&self) -> DbResult<Vec<UserTypeInfo>> {
        self.query_as(
            "SELECT schema_name AS schema, type_name AS name, logical_type AS base_type \
             FROM duckdb_types() \
             WHERE NOT internal AND database_name = current_database()",
        )
    }

    async fn table_row_counts(&self) -> DbResult<Vec<TableRowCount>> {
        self.query_as(
            r#"SELECT schema_name AS schema, table_name AS "table",
                CAST(estimated_size AS BIGINT) AS row_count
            FROM duckdb_tables()
            WHERE database_name = current_database()"#,
        )
    }

    async fn profile_table(&self, schema: &str, table: &str) -> DbResult<Vec<ColumnProfile>> {
        let sql = format!(
            r#"SELECT column_name AS "column", column_type AS data_type,
                CAST(null_percentage AS DOUBLE) / 100.0 AS null_fraction,
                CAST(approx_unique AS BIGINT) AS distinct_count
            FROM (SUMMARIZE {})"#,
            quote_qualified(schema, table)
        );
        let rows: Vec<ProfileRow> = self.query_as(&sql)?;
        Ok(rows
            .into_iter()
            .map(|r| ColumnProfile {
                column: r.column,
                data_type: r.data_type,
                null_fraction: r.null_fraction,
                distinct_count: r.distinct_count,
            })
            .collect())
    }
}

/// Opens DuckDB connections from `ConnectionTarget`s
#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbFactory;

impl DuckDbFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProviderFactory for DuckDbFactory {
    fn provider_type(&self) -> ProviderType {
        ProviderType::DuckDb
    }

    /// A target naming a single file becomes `server = parent directory`,
    /// `database = file stem`.
    fn resolve_target(&self, target: ConnectionTarget) -> DbResult<ConnectionTarget> {
        let path = Path::new(&target.server);
        if target.database.is_some() || !path.is_file() {
            return Ok(target);
        }
        let database = file_stem(path).ok_or_else(|| {
            DbError::InvalidConnectionString(format!("cannot name database for '{}'", target.server))
        })?;
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut resolved = target.with_database(&database);
        resolved.server = parent.display().to_string();
        Ok(resolved)
    }

    async fn connect(&self, target: &ConnectionTarget) -> DbResult<Arc<dyn CatalogProvider>> {
        let server = Path::new(&target.server);
        let provider = match &target.database {
            None => DuckDbProvider::open_server(server)?,
            Some(database) => {
                let path = database_path(server, database).ok_or_else(|| {
                    DbError::ConnectionError(format!(
                        "database '{}' not found in {}",
                        database,
                        server.display()
                    ))
                })?;
                DuckDbProvider::open_database(&path)?
            }
        };
        log::debug!(
            "Opened duckdb connection: server={} database={:?}",
            provider.server_name,
            provider.database_name
        );
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
