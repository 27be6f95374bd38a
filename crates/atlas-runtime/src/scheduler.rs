//! Session-scoped analyzer scheduling
//!
//! `run_analyzer` resolves the analyzers a request needs from the
//! dependency table, runs them on a working copy of the session result
//! and commits the copy only when every step succeeded.

use crate::error::{RuntimeError, RuntimeResult};
use crate::fanout::ServerFanoutOrchestrator;
use crate::pipeline::Pipeline;
use crate::progress::ProgressSink;
use crate::session::{Session, SessionManager};
use atlas_analysis::AnalyzerRegistry;
use atlas_core::result::merge::{
    clear_database, extract_database, reclassify_external, replace_database,
    replace_sections_if_nonempty,
};
use atlas_core::{AnalysisResult, AnalyzerDag};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One `run_analyzer` call
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub session_id: Uuid,
    pub analyzer: String,
    /// Clear the analyzer and everything downstream of it first
    pub force: bool,
    /// Server mode only: refresh just this database
    pub target_database: Option<String>,
    pub cancel: CancellationToken,
}

impl RunRequest {
    pub fn new(session_id: Uuid, analyzer: impl Into<String>) -> Self {
        Self {
            session_id,
            analyzer: analyzer.into(),
            force: false,
            target_database: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target_database = Some(database.into());
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

pub struct DependencyScheduler {
    sessions: Arc<SessionManager>,
    registry: AnalyzerRegistry,
    dag: AnalyzerDag,
}

impl DependencyScheduler {
    /// Scheduler over the built-in analyzers and the configured dependency table
    pub fn new(sessions: Arc<SessionManager>) -> RuntimeResult<Self> {
        Self::with_registry(sessions, AnalyzerRegistry::with_defaults())
    }

    pub fn with_registry(
        sessions: Arc<SessionManager>,
        registry: AnalyzerRegistry,
    ) -> RuntimeResult<Self> {
        let dag = sessions.config().analyzer_dag()?;
        registry.check_dag(&dag)?;
        Ok(Self {
            sessions,
            registry,
            dag,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn dag(&self) -> &AnalyzerDag {
        &self.dag
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    /// Run `request.analyzer` and whatever it still needs, returning the
    /// session's result afterwards.
    ///
    /// A newer request for the same session and analyzer cancels this one;
    /// a cancelled call returns `Cancelled` and commits nothing.
    pub async fn run_analyzer(
        &self,
        request: RunRequest,
        sink: &dyn ProgressSink,
    ) -> RuntimeResult<AnalysisResult> {
        if !self.dag.contains(&request.analyzer) {
            return Err(RuntimeError::UnknownAnalyzer {
                name: request.analyzer,
            });
        }
        let session = self.sessions.get(request.session_id).await?;
        let ticket = session.begin_run(&request.analyzer, &request.cancel);
        let cancel = ticket.token.clone();

        let mut state = session.lock().await;
        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }

        let mut working = state
            .result
            .clone()
            .unwrap_or_else(|| session.empty_result());
        let database = request.target_database.as_deref();

        let changed = match (session.is_server_mode(), database) {
            (true, Some(db)) => {
                self.run_targeted(&session, &mut working, &request, db, sink, &cancel)
                    .await?
            }
            (true, None) => {
                self.run_server(&session, &mut working, &request, sink, &cancel)
                    .await?
            }
            (false, _) => {
                if let Some(db) = database {
                    log::debug!(
                        "Ignoring target database {} on single-database session {}",
                        db,
                        session.id()
                    );
                }
                self.clear_forced(&mut working, &request);
                let steps = self.resolve(&request.analyzer, &working)?;
                if !steps.is_empty() {
                    Pipeline::new(&self.registry, self.sessions.config())
                        .run(Arc::clone(&state.provider), &steps, &mut working, sink, &cancel)
                        .await?;
                }
                request.force || !steps.is_empty()
            }
        };

        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        if changed {
            session.commit(&mut state, working.clone());
        } else {
            log::debug!(
                "Analyzer '{}' is up to date on session {}",
                request.analyzer,
                session.id()
            );
        }
        drop(ticket);
        Ok(working)
    }

    /// Analyzers to run, dependencies first; empty when up to date
    fn resolve(&self, name: &str, result: &AnalysisResult) -> RuntimeResult<Vec<String>> {
        let steps = self.dag.resolve(name, |a| {
            self.registry
                .section_for(a)
                .is_some_and(|s| result.has_section(s))
        })?;
        Ok(steps)
    }

    fn clear_forced(&self, result: &mut AnalysisResult, request: &RunRequest) {
        if !request.force {
            return;
        }
        let invalidated = self.dag.invalidation_set(&request.analyzer);
        for section in self.registry.sections_for(&invalidated) {
            result.clear_section(section);
        }
    }

    /// Refresh one database of a server session on its own connection and
    /// replace that database's rows.
    async fn run_targeted(
        &self,
        session: &Session,
        working: &mut AnalysisResult,
        request: &RunRequest,
        database: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RuntimeResult<bool> {
        if request.force {
            let invalidated = self.dag.invalidation_set(&request.analyzer);
            clear_database(working, database, &self.registry.sections_for(&invalidated));
        }

        let mut fragment = extract_database(working, database);
        let steps = self.resolve(&request.analyzer, &fragment)?;
        if steps.is_empty() {
            return Ok(request.force);
        }

        let provider = session
            .factory()
            .connect(&session.target().with_database(database))
            .await?;
        Pipeline::new(&self.registry, self.sessions.config())
            .run(provider, &steps, &mut fragment, sink, cancel)
            .await?;

        replace_database(working, fragment, database, &self.registry.sections_for(&steps));
        if !working.analyzed(database) {
            working.databases.push(database.to_string());
        }
        working
            .failed_databases
            .retain(|f| !f.database.eq_ignore_ascii_case(database));
        reclassify_external(working);
        Ok(true)
    }

    /// Re-run the analyzer set across the whole server and fold the fresh
    /// aggregate into the session result.
    async fn run_server(
        &self,
        session: &Session,
        working: &mut AnalysisResult,
        request: &RunRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RuntimeResult<bool> {
        self.clear_forced(working, request);
        if self.resolve(&request.analyzer, working)?.is_empty() {
            return Ok(request.force);
        }

        // Every database starts from nothing, so run the full plan.
        let plan = self.dag.execution_plan(&[request.analyzer.as_str()])?;
        let fresh = ServerFanoutOrchestrator::new(
            session.factory(),
            &self.registry,
            self.sessions.config(),
        )
        .run(session.target(), &plan, sink, cancel)
        .await?;

        replace_sections_if_nonempty(working, fresh);
        reclassify_external(working);
        Ok(true)
    }
}
