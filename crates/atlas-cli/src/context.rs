//! Runtime context for CLI commands

use anyhow::{Context, Result};
use atlas_core::config::DEFAULT_CONFIG_FILE;
use atlas_core::{Config, ProviderType};
use atlas_runtime::{DependencyScheduler, SessionInfo, SessionManager};
use std::path::Path;
use std::sync::Arc;

use crate::cli::{ConnectionArgs, GlobalArgs};

/// Loaded configuration plus the session runtime
pub(crate) struct CliContext {
    pub config: Config,
    pub scheduler: DependencyScheduler,
    pub verbose: bool,
}

impl CliContext {
    /// Load the config (explicit path, else ./atlas.yml when present) and
    /// build the scheduler over it
    pub fn new(global: &GlobalArgs) -> Result<Self> {
        let path = global.config.as_deref().map(Path::new);
        let config = Config::load_or_default(path).context("Failed to load configuration")?;

        let sessions = Arc::new(SessionManager::new(config.clone()));
        let scheduler =
            DependencyScheduler::new(sessions).context("Invalid analyzer configuration")?;

        let ctx = Self {
            config,
            scheduler,
            verbose: global.verbose,
        };
        ctx.verbose(&format!(
            "Using config {}",
            path.map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("{} (or defaults)", DEFAULT_CONFIG_FILE))
        ));
        Ok(ctx)
    }

    /// Print verbose output if enabled
    pub fn verbose(&self, msg: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", msg);
        }
    }

    /// Provider from the command line, else the config file
    pub fn provider(&self, conn: &ConnectionArgs) -> ProviderType {
        conn.provider.unwrap_or(self.config.provider)
    }

    /// Open a session for the connection arguments
    pub async fn connect(&self, conn: &ConnectionArgs) -> Result<SessionInfo> {
        let provider = self.provider(conn);
        self.verbose(&format!("Connecting with {} provider", provider));
        let info = self
            .scheduler
            .sessions()
            .connect(&conn.connection, provider)
            .await
            .with_context(|| format!("Failed to connect to '{}'", conn.connection))?;
        self.verbose(&format!(
            "Session {} on {} ({})",
            info.id,
            info.server_name,
            info.database.as_deref().unwrap_or("server mode")
        ));
        Ok(info)
    }
}
