//! Connection-string parsing
//!
//! Two forms are accepted:
//! - `key=value;` pairs: `server` / `data source` / `host` name the server,
//!   `database` / `initial catalog` / `dbname` name the database
//! - a bare path, split into server and database by the provider
//!
//! A target without a database selects server mode.

use crate::error::{DbError, DbResult};
use std::collections::BTreeMap;
use std::fmt;

const SERVER_KEYS: &[&str] = &["server", "data source", "host", "address", "path"];
const DATABASE_KEYS: &[&str] = &["database", "initial catalog", "dbname"];

/// A parsed connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Server address, path or directory
    pub server: String,
    /// Database name; `None` means the whole server
    pub database: Option<String>,
    /// Remaining key/value options, lowercased keys
    pub options: BTreeMap<String, String>,
}

impl ConnectionTarget {
    /// Parse a connection string
    pub fn parse(raw: &str) -> DbResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DbError::InvalidConnectionString(
                "connection string is empty".into(),
            ));
        }

        if !raw.contains('=') {
            return Ok(Self {
                server: raw.to_string(),
                database: None,
                options: BTreeMap::new(),
            });
        }

        let mut server = None;
        let mut database = None;
        let mut options = BTreeMap::new();

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(DbError::InvalidConnectionString(format!(
                    "expected key=value, found '{}'",
                    pair
                )));
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if SERVER_KEYS.contains(&key.as_str()) {
                server = Some(value);
            } else if DATABASE_KEYS.contains(&key.as_str()) {
                database = Some(value).filter(|v| !v.is_empty());
            } else {
                options.insert(key, value);
            }
        }

        let server = server.ok_or_else(|| {
            DbError::InvalidConnectionString("missing 'server' (or 'data source')".into())
        })?;

        Ok(Self {
            server,
            database,
            options,
        })
    }

    /// Whether this target addresses a whole server
    pub fn is_server_mode(&self) -> bool {
        self.database.is_none()
    }

    /// The same server scoped to exactly `database`
    pub fn with_database(&self, database: &str) -> Self {
        Self {
            server: self.server.clone(),
            database: Some(database.to_string()),
            options: self.options.clone(),
        }
    }

    /// The same server with no database (the administrative connection)
    pub fn without_database(&self) -> Self {
        Self {
            server: self.server.clone(),
            database: None,
            options: self.options.clone(),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server={}", self.server)?;
        if let Some(db) = &self.database {
            write!(f, ";database={}", db)?;
        }
        for (k, v) in &self.options {
            write!(f, ";{}={}", k, v)?;
        }
        Ok(())
    }
}
