//! Configuration types and parsing for atlas.yml

use crate::dag::{default_dependencies, AnalyzerDag};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "atlas.yml";

/// Main configuration from atlas.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Provider used when a connection does not name one
    #[serde(default)]
    pub provider: ProviderType,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub analyzers: AnalyzersConfig,

    #[serde(default)]
    pub profiling: ProfilingConfig,

    #[serde(default)]
    pub relationships: RelationshipsConfig,

    #[serde(default)]
    pub quality: QualityConfig,
}

/// Provider type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// DuckDB files (default)
    #[default]
    DuckDb,
    /// JSON catalog snapshot
    Snapshot,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::DuckDb => write!(f, "duckdb"),
            ProviderType::Snapshot => write!(f, "snapshot"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duckdb" => Ok(ProviderType::DuckDb),
            "snapshot" | "json" => Ok(ProviderType::Snapshot),
            other => Err(CoreError::ConfigInvalid {
                message: format!("unknown provider '{}'", other),
            }),
        }
    }
}

/// Session lifetime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How often the idle sweep runs
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    1800
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Server fan-out settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Additional database names excluded from fan-out
    #[serde(default)]
    pub system_databases: Vec<String>,

    /// Analyze databases the engine reports as offline
    #[serde(default)]
    pub include_offline: bool,
}

impl ServerConfig {
    /// Whether `name` is a built-in or configured system database
    pub fn is_excluded(&self, name: &str) -> bool {
        crate::catalog::is_system_database(name)
            || self
                .system_databases
                .iter()
                .any(|s| s.eq_ignore_ascii_case(name))
    }
}

/// Analyzer dependency table overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzersConfig {
    /// Entries replace or extend the built-in table
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilingConfig {
    /// Maximum number of tables whose columns are profiled
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,

    /// Collect per-column statistics (row counts are always collected)
    #[serde(default = "default_true")]
    pub profile_columns: bool,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            max_tables: default_max_tables(),
            profile_columns: true,
        }
    }
}

fn default_max_tables() -> usize {
    500
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipsConfig {
    /// Implicit relationships below this confidence are dropped
    #[serde(default)]
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityConfig {
    /// Column count at which a table is reported as wide
    #[serde(default = "default_wide_table_columns")]
    pub wide_table_columns: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            wide_table_columns: default_wide_table_columns(),
        }
    }
}

fn default_wide_table_columns() -> usize {
    50
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, else from `atlas.yml` in the working
    /// directory when present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> CoreResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate value ranges and the analyzer table
    pub fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.relationships.min_confidence) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "relationships.min_confidence must be within [0, 1], got {}",
                    self.relationships.min_confidence
                ),
            });
        }
        if self.sessions.idle_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "sessions.idle_timeout_secs must be greater than zero".into(),
            });
        }
        self.analyzer_dag()?;
        Ok(())
    }

    /// The built-in dependency table overlaid with configured entries
    pub fn analyzer_dependencies(&self) -> BTreeMap<String, Vec<String>> {
        let mut table = default_dependencies();
        for (name, deps) in &self.analyzers.dependencies {
            table.insert(name.clone(), deps.clone());
        }
        table
    }

    /// Build and validate the analyzer DAG
    pub fn analyzer_dag(&self) -> CoreResult<AnalyzerDag> {
        AnalyzerDag::build(&self.analyzer_dependencies())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
