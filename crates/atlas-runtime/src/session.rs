//! Sessions: one open connection plus the last committed result
//!
//! A session's state lock serializes every analyzer run on it. Sessions
//! idle longer than `sessions.idle_timeout_secs` are evicted by the sweep.

use crate::error::{RuntimeError, RuntimeResult};
use atlas_core::{AnalysisResult, Config, ProviderType};
use atlas_db::{factory_for, CatalogProvider, ConnectionTarget, ProviderFactory};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What a caller learns when a session is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: Uuid,
    pub server_mode: bool,
    pub server_name: String,
    pub database: Option<String>,
}

/// Mutable state guarded by the session lock
pub(crate) struct SessionState {
    pub(crate) provider: Arc<dyn CatalogProvider>,
    pub(crate) result: Option<AnalysisResult>,
}

/// Cancellation token of the newest run per analyzer
#[derive(Default)]
struct InFlight {
    next_ticket: u64,
    runs: HashMap<String, (u64, CancellationToken)>,
}

/// Handle for one registered run; deregisters itself on drop
pub(crate) struct RunTicket<'a> {
    session: &'a Session,
    analyzer: String,
    ticket: u64,
    pub(crate) token: CancellationToken,
}

impl Drop for RunTicket<'_> {
    fn drop(&mut self) {
        let mut inflight = self
            .session
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if inflight
            .runs
            .get(&self.analyzer)
            .is_some_and(|(t, _)| *t == self.ticket)
        {
            inflight.runs.remove(&self.analyzer);
        }
    }
}

pub struct Session {
    id: Uuid,
    connection_string: String,
    provider_type: ProviderType,
    target: ConnectionTarget,
    server_name: String,
    factory: Arc<dyn ProviderFactory>,
    state: Mutex<SessionState>,
    /// Unix milliseconds of the last request
    last_activity: AtomicI64,
    inflight: std::sync::Mutex<InFlight>,
    runs: AtomicU64,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn is_server_mode(&self) -> bool {
        self.target.is_server_mode()
    }

    pub(crate) fn factory(&self) -> &dyn ProviderFactory {
        self.factory.as_ref()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            server_mode: self.is_server_mode(),
            server_name: self.server_name.clone(),
            database: self.target.database.clone(),
        }
    }

    /// Number of analyzer runs committed on this session
    pub fn committed_runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.last_activity.load(Ordering::Relaxed))
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn idle_for(&self) -> Duration {
        (Utc::now() - self.last_activity())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub(crate) fn touch(&self) {
        self.last_activity
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// An empty result scoped like this session
    pub(crate) fn empty_result(&self) -> AnalysisResult {
        match &self.target.database {
            Some(db) => AnalysisResult::for_database(db.clone()),
            None => AnalysisResult::for_server(self.server_name.clone()),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// A run holds the state lock
    pub fn is_busy(&self) -> bool {
        self.state.try_lock().is_err()
    }

    pub(crate) fn commit(&self, state: &mut SessionState, result: AnalysisResult) {
        state.result = Some(result);
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    /// Register a run of `analyzer`, cancelling the run it supersedes.
    pub(crate) fn begin_run(&self, analyzer: &str, parent: &CancellationToken) -> RunTicket<'_> {
        let token = parent.child_token();
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight.next_ticket += 1;
        let ticket = inflight.next_ticket;
        if let Some((_, previous)) = inflight
            .runs
            .insert(analyzer.to_string(), (ticket, token.clone()))
        {
            log::debug!(
                "Session {}: superseding in-flight '{}' run",
                self.id,
                analyzer
            );
            previous.cancel();
        }
        RunTicket {
            session: self,
            analyzer: analyzer.to_string(),
            ticket,
            token,
        }
    }

    /// Cancel every in-flight run
    fn cancel_all(&self) {
        let inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, token) in inflight.runs.values() {
            token.cancel();
        }
    }
}

/// Owns every live session
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    factories: HashMap<ProviderType, Arc<dyn ProviderFactory>>,
    config: Arc<Config>,
}

impl SessionManager {
    /// Manager with the default factory for every provider type
    pub fn new(config: Config) -> Self {
        let factories = [ProviderType::DuckDb, ProviderType::Snapshot]
            .into_iter()
            .map(|p| (p, factory_for(p)))
            .collect();
        Self {
            sessions: RwLock::new(HashMap::new()),
            factories,
            config: Arc::new(config),
        }
    }

    /// Replace the factory used for its provider type
    pub fn with_factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.factories.insert(factory.provider_type(), factory);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a connection and register a session for it.
    ///
    /// A connection string without a database opens a server-mode session
    /// holding the administrative connection.
    pub async fn connect(
        &self,
        connection_string: &str,
        provider_type: ProviderType,
    ) -> RuntimeResult<SessionInfo> {
        let factory = self
            .factories
            .get(&provider_type)
            .cloned()
            .ok_or_else(|| RuntimeError::UnsupportedProvider(provider_type.to_string()))?;
        let target = factory.resolve_target(ConnectionTarget::parse(connection_string)?)?;
        let provider = factory.connect(&target).await?;

        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            connection_string: connection_string.to_string(),
            provider_type,
            server_name: provider.server_name().to_string(),
            target,
            factory,
            state: Mutex::new(SessionState {
                provider,
                result: None,
            }),
            last_activity: AtomicI64::new(Utc::now().timestamp_millis()),
            inflight: std::sync::Mutex::new(InFlight::default()),
            runs: AtomicU64::new(0),
        });
        let info = session.info();
        log::info!(
            "Session {} opened ({} mode, {})",
            info.id,
            if info.server_mode { "server" } else { "database" },
            session.target
        );
        self.sessions.write().await.insert(info.id, session);
        Ok(info)
    }

    /// Look up a session and mark it active
    pub async fn get(&self, id: Uuid) -> RuntimeResult<Arc<Session>> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RuntimeError::SessionNotFound { id })?;
        session.touch();
        Ok(session)
    }

    /// The last committed result, `None` before the first run
    pub async fn get_result(&self, id: Uuid) -> RuntimeResult<Option<AnalysisResult>> {
        let session = self.get(id).await?;
        let state = session.lock().await;
        Ok(state.result.clone())
    }

    /// Drop a session, cancelling its in-flight runs. Returns whether it existed.
    pub async fn disconnect(&self, id: Uuid) -> bool {
        match self.sessions.write().await.remove(&id) {
            Some(session) => {
                session.cancel_all();
                log::info!("Session {} disconnected", id);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Evict sessions idle past the configured timeout; busy sessions stay.
    pub async fn sweep_idle(&self) -> Vec<Uuid> {
        let timeout = self.config.sessions.idle_timeout();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|s| s.idle_for() > timeout && !s.is_busy())
            .map(|s| s.id)
            .collect();
        for id in &expired {
            if let Some(session) = sessions.remove(id) {
                session.cancel_all();
                log::info!(
                    "Evicted idle session {} (idle {}s)",
                    id,
                    session.idle_for().as_secs()
                );
            }
        }
        expired
    }

    /// Run [`SessionManager::sweep_idle`] every `sessions.sweep_interval_secs`
    /// until `shutdown` is cancelled.
    pub fn spawn_idle_sweeper(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = manager.config.sessions.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = manager.sweep_idle().await;
                        if !evicted.is_empty() {
                            log::debug!("Idle sweep evicted {} session(s)", evicted.len());
                        }
                    }
                }
            }
        })
    }
}
