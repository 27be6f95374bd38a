//! Server fan-out: analyze every database on a server and merge the fragments
//!
//! Databases run strictly one after another, each on its own connection.
//! A failing database is recorded and skipped; cancellation aborts the run.

use crate::error::{RuntimeError, RuntimeResult};
use crate::pipeline::Pipeline;
use crate::progress::{ProgressEvent, ProgressSink};
use atlas_analysis::AnalyzerRegistry;
use atlas_core::result::merge::{append_database, reclassify_external};
use atlas_core::{AnalysisResult, Config, DatabaseFailure};
use atlas_db::{ConnectionTarget, ProviderFactory};
use tokio_util::sync::CancellationToken;

/// Databases discovered on a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDiscovery {
    pub server_name: String,
    /// User databases selected for analysis, in enumeration order
    pub databases: Vec<String>,
    /// System or offline databases left out
    pub skipped: Vec<String>,
}

pub struct ServerFanoutOrchestrator<'a> {
    factory: &'a dyn ProviderFactory,
    registry: &'a AnalyzerRegistry,
    config: &'a Config,
}

impl<'a> ServerFanoutOrchestrator<'a> {
    pub fn new(
        factory: &'a dyn ProviderFactory,
        registry: &'a AnalyzerRegistry,
        config: &'a Config,
    ) -> Self {
        Self {
            factory,
            registry,
            config,
        }
    }

    /// Enumerate user databases over a transient administrative connection.
    pub async fn discover(&self, target: &ConnectionTarget) -> RuntimeResult<ServerDiscovery> {
        let admin = self.factory.connect(&target.without_database()).await?;
        let server_name = admin.server_name().to_string();
        let entries = admin.enumerate_databases().await?;
        drop(admin);

        let server = &self.config.server;
        let mut discovery = ServerDiscovery {
            server_name,
            databases: Vec::new(),
            skipped: Vec::new(),
        };
        for entry in entries {
            let selected = !entry.is_system
                && !server.is_excluded(&entry.name)
                && (entry.is_online || server.include_offline);
            if selected {
                discovery.databases.push(entry.name);
            } else {
                discovery.skipped.push(entry.name);
            }
        }
        log::debug!(
            "Discovered {} database(s) on {} ({} skipped)",
            discovery.databases.len(),
            discovery.server_name,
            discovery.skipped.len()
        );
        Ok(discovery)
    }

    /// Run `analyzers` (already in dependency order) against every database.
    ///
    /// Emits a running event per database, then completed or failed.
    pub async fn run<S: AsRef<str>>(
        &self,
        target: &ConnectionTarget,
        analyzers: &[S],
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RuntimeResult<AnalysisResult> {
        let discovery = self.discover(target).await?;
        let mut aggregate = AnalysisResult::for_server(discovery.server_name);
        let total = discovery.databases.len();

        for (i, database) in discovery.databases.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }
            sink.emit(ProgressEvent::running(database, i + 1, total));

            let done = match self
                .analyze_database(&target.with_database(database), analyzers, cancel)
                .await
            {
                Ok(fragment) => {
                    append_database(&mut aggregate, fragment, database);
                    aggregate.databases.push(database.clone());
                    ProgressEvent::completed(database, i + 1, total)
                }
                Err(RuntimeError::Cancelled) => return Err(RuntimeError::Cancelled),
                Err(e) => {
                    log::warn!("Skipping database {}: {}", database, e);
                    aggregate.failed_databases.push(DatabaseFailure {
                        database: database.clone(),
                        error: e.to_string(),
                    });
                    ProgressEvent::failed(database, i + 1, total)
                }
            };
            sink.emit(done);
        }

        let reclassified = reclassify_external(&mut aggregate);
        if reclassified > 0 {
            log::debug!(
                "Reclassified {} cross-database dependencies as internal",
                reclassified
            );
        }
        Ok(aggregate)
    }

    async fn analyze_database<S: AsRef<str>>(
        &self,
        target: &ConnectionTarget,
        analyzers: &[S],
        cancel: &CancellationToken,
    ) -> RuntimeResult<AnalysisResult> {
        let provider = self.factory.connect(target).await?;
        let database = target.database.clone().unwrap_or_default();
        let mut fragment = AnalysisResult::for_database(database);
        Pipeline::new(self.registry, self.config)
            .run(provider, analyzers, &mut fragment, &crate::progress::NoopSink, cancel)
            .await?;
        Ok(fragment)
    }
}
