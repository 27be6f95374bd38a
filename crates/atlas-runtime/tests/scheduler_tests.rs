//! Scheduler and session scenarios over snapshot servers

use async_trait::async_trait;
use atlas_analysis::test_utils::{catalog_for, routine, sales_inventory, table_with};
use atlas_analysis::{AnalysisContext, AnalyzeResult, Analyzer, AnalyzerRegistry};
use atlas_core::{AnalysisResult, Config, ObjectType, ProviderType, SchemaInventory, Section, SectionData};
use atlas_db::{CatalogSnapshot, DatabaseSnapshot, ServerSnapshot, SnapshotFactory};
use atlas_runtime::{
    CancellationToken, ChannelSink, DependencyScheduler, NoopSink, RunRequest, RuntimeError,
    SessionManager, StepStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

const SERVER: &str = "server=sql01";
const SALES: &str = "server=sql01;database=Sales";

fn snapshot() -> ServerSnapshot {
    let hr = SchemaInventory {
        tables: vec![table_with("dbo", "Employees", &[("EmployeeId", "int", true)])],
        ..Default::default()
    };
    let mut broken = DatabaseSnapshot::new("Legacy", CatalogSnapshot::default());
    broken.connect_error = Some("database is in recovery".into());
    ServerSnapshot {
        server_name: "sql01".into(),
        databases: vec![
            DatabaseSnapshot::new("Sales", catalog_for(&sales_inventory())),
            DatabaseSnapshot::new("Hr", catalog_for(&hr)),
            broken,
        ],
    }
}

/// App reads a table that lives in Shared
fn cross_database_snapshot() -> ServerSnapshot {
    let app = SchemaInventory {
        tables: vec![table_with("dbo", "Settings", &[("SettingId", "int", true)])],
        procedures: vec![routine(
            "dbo",
            "usp_Rates",
            "CREATE PROCEDURE dbo.usp_Rates AS SELECT * FROM Shared.dbo.Rates",
        )],
        ..Default::default()
    };
    let shared = SchemaInventory {
        tables: vec![table_with("dbo", "Rates", &[("RateId", "int", true)])],
        ..Default::default()
    };
    ServerSnapshot {
        server_name: "sql02".into(),
        databases: vec![
            DatabaseSnapshot::new("App", catalog_for(&app)),
            DatabaseSnapshot::new("Shared", catalog_for(&shared)),
        ],
    }
}

fn manager_for(snapshot: ServerSnapshot, config: Config) -> Arc<SessionManager> {
    Arc::new(
        SessionManager::new(config).with_factory(Arc::new(SnapshotFactory::from_snapshot(snapshot))),
    )
}

fn manager_with(config: Config) -> Arc<SessionManager> {
    manager_for(snapshot(), config)
}

fn scheduler() -> DependencyScheduler {
    DependencyScheduler::new(manager_with(Config::default())).unwrap()
}

async fn connect(scheduler: &DependencyScheduler, conn: &str) -> Uuid {
    scheduler
        .sessions()
        .connect(conn, ProviderType::Snapshot)
        .await
        .unwrap()
        .id
}

fn table_count(result: &AnalysisResult, database: &str) -> usize {
    result
        .schema
        .as_ref()
        .map(|s| {
            s.tables
                .iter()
                .filter(|t| t.database.as_deref() == Some(database))
                .count()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_unknown_analyzer_checked_before_session() {
    let scheduler = scheduler();
    let err = scheduler
        .run_analyzer(RunRequest::new(Uuid::new_v4(), "lineage"), &NoopSink)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownAnalyzer { name } if name == "lineage"));

    let missing = Uuid::new_v4();
    let err = scheduler
        .run_analyzer(RunRequest::new(missing, "schema"), &NoopSink)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::SessionNotFound { id } if id == missing));
}

#[tokio::test]
async fn test_resolves_dependencies_in_order() {
    let scheduler = scheduler();
    let id = connect(&scheduler, SALES).await;
    let (sink, mut rx) = ChannelSink::new();

    let result = scheduler
        .run_analyzer(RunRequest::new(id, "quality"), &sink)
        .await
        .unwrap();
    assert_eq!(
        result.sections(),
        vec![Section::Schema, Section::Relationships, Section::Quality]
    );

    let mut running = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.status == StepStatus::Running {
            running.push((event.step, event.current, event.total));
        }
    }
    assert_eq!(
        running,
        vec![
            ("schema".to_string(), 1, 3),
            ("relationships".to_string(), 2, 3),
            ("quality".to_string(), 3, 3),
        ]
    );
}

#[tokio::test]
async fn test_satisfied_analyzer_is_noop() {
    let scheduler = scheduler();
    let id = connect(&scheduler, SALES).await;
    let session = scheduler.sessions().get(id).await.unwrap();

    assert!(scheduler.sessions().get_result(id).await.unwrap().is_none());
    let first = scheduler
        .run_analyzer(RunRequest::new(id, "relationships"), &NoopSink)
        .await
        .unwrap();
    let (sink, mut rx) = ChannelSink::new();
    let second = scheduler
        .run_analyzer(RunRequest::new(id, "relationships"), &sink)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(rx.try_recv().is_err());
    assert_eq!(session.committed_runs(), 1);
}

#[tokio::test]
async fn test_force_clears_transitive_dependents() {
    let scheduler = scheduler();
    let id = connect(&scheduler, SALES).await;
    for analyzer in ["usage", "quality", "indexing"] {
        scheduler
            .run_analyzer(RunRequest::new(id, analyzer), &NoopSink)
            .await
            .unwrap();
    }
    let before = scheduler.sessions().get_result(id).await.unwrap().unwrap();
    assert_eq!(before.sections().len(), 6);

    let result = scheduler
        .run_analyzer(RunRequest::new(id, "schema").force(true), &NoopSink)
        .await
        .unwrap();
    assert_eq!(result.sections(), vec![Section::Schema]);

    let result = scheduler
        .run_analyzer(RunRequest::new(id, "relationships").force(true), &NoopSink)
        .await
        .unwrap();
    assert_eq!(
        result.sections(),
        vec![Section::Schema, Section::Relationships]
    );
}

#[tokio::test]
async fn test_server_full_run_records_failures() {
    let scheduler = scheduler();
    let id = connect(&scheduler, SERVER).await;
    let info = scheduler.sessions().get(id).await.unwrap().info();
    assert!(info.server_mode);
    assert_eq!(info.server_name, "sql01");

    let result = scheduler
        .run_analyzer(RunRequest::new(id, "schema"), &NoopSink)
        .await
        .unwrap();
    assert!(result.server_mode);
    assert_eq!(result.databases, vec!["Sales", "Hr"]);
    assert_eq!(result.failed_databases[0].database, "Legacy");
    assert_eq!(table_count(&result, "Sales"), 3);
    assert_eq!(table_count(&result, "Hr"), 1);
}

#[tokio::test]
async fn test_targeted_refresh_replaces_rows() {
    let scheduler = scheduler();
    let id = connect(&scheduler, SERVER).await;
    scheduler
        .run_analyzer(RunRequest::new(id, "indexing"), &NoopSink)
        .await
        .unwrap();

    for _ in 0..2 {
        let result = scheduler
            .run_analyzer(
                RunRequest::new(id, "schema").force(true).database("Sales"),
                &NoopSink,
            )
            .await
            .unwrap();
        assert_eq!(table_count(&result, "Sales"), 3);
        assert_eq!(table_count(&result, "Hr"), 1);
    }

    let result = scheduler
        .run_analyzer(RunRequest::new(id, "relationships").database("Sales"), &NoopSink)
        .await
        .unwrap();
    let graph = result.relationships.as_ref().unwrap();
    assert!(graph
        .nodes
        .iter()
        .all(|n| n.database.as_deref() == Some("Sales")));
    assert!(graph.node("Sales.dbo.Customers").is_some());

    // already satisfied for Sales
    let again = scheduler
        .run_analyzer(RunRequest::new(id, "relationships").database("Sales"), &NoopSink)
        .await
        .unwrap();
    assert_eq!(again.relationships, result.relationships);
}

#[tokio::test]
async fn test_targeted_refresh_with_empty_section_is_noop() {
    let scheduler = scheduler();
    let id = connect(&scheduler, SERVER).await;
    let session = scheduler.sessions().get(id).await.unwrap();

    let first = scheduler
        .run_analyzer(RunRequest::new(id, "quality").database("Hr"), &NoopSink)
        .await
        .unwrap();
    let hr_issues = first
        .quality_issues
        .as_ref()
        .unwrap()
        .iter()
        .filter(|i| i.database.as_deref() == Some("Hr"))
        .count();
    assert_eq!(hr_issues, 0);
    assert!(first.is_completed("Hr", Section::Quality));

    let (sink, mut rx) = ChannelSink::new();
    let second = scheduler
        .run_analyzer(RunRequest::new(id, "quality").database("Hr"), &sink)
        .await
        .unwrap();
    assert!(rx.try_recv().is_err());
    assert_eq!(second, first);
    assert_eq!(session.committed_runs(), 1);

    // after a full run every database has completed quality
    scheduler
        .run_analyzer(RunRequest::new(id, "quality").force(true), &NoopSink)
        .await
        .unwrap();
    let (sink, mut rx) = ChannelSink::new();
    scheduler
        .run_analyzer(RunRequest::new(id, "quality").database("Hr"), &sink)
        .await
        .unwrap();
    assert!(rx.try_recv().is_err());
}

fn rates_dependency(result: &AnalysisResult) -> bool {
    result
        .relationships
        .as_ref()
        .unwrap()
        .dependencies
        .iter()
        .find(|d| d.to_name == "Rates")
        .unwrap()
        .is_cross_database
}

#[tokio::test]
async fn test_targeted_refresh_keeps_analyzed_targets_internal() {
    let sessions = manager_for(cross_database_snapshot(), Config::default());
    let scheduler = DependencyScheduler::new(sessions).unwrap();
    let id = connect(&scheduler, "server=sql02").await;

    let full = scheduler
        .run_analyzer(RunRequest::new(id, "relationships"), &NoopSink)
        .await
        .unwrap();
    assert_eq!(full.databases, vec!["App", "Shared"]);
    assert!(!rates_dependency(&full));

    let refreshed = scheduler
        .run_analyzer(
            RunRequest::new(id, "relationships").force(true).database("App"),
            &NoopSink,
        )
        .await
        .unwrap();
    assert!(!rates_dependency(&refreshed));

    let graph = refreshed.relationships.as_ref().unwrap();
    let rates: Vec<_> = graph
        .nodes
        .iter()
        .filter(|n| n.key.eq_ignore_ascii_case("Shared.dbo.Rates"))
        .collect();
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].object_type, ObjectType::Table);
    assert!(rates[0].external_database.is_none());
    assert!(rates[0].referenced_by.contains("App.dbo.usp_Rates"));
}

#[tokio::test]
async fn test_server_rerun_keeps_unrequested_sections() {
    let scheduler = scheduler();
    let id = connect(&scheduler, SERVER).await;
    scheduler
        .run_analyzer(RunRequest::new(id, "indexing"), &NoopSink)
        .await
        .unwrap();
    let result = scheduler
        .run_analyzer(RunRequest::new(id, "profiling"), &NoopSink)
        .await
        .unwrap();

    assert!(result.has_section(Section::Indexes));
    assert!(result.has_section(Section::Profiles));
    assert_eq!(table_count(&result, "Sales"), 3);
}

/// Blocks on its first call until cancelled, then behaves like an empty schema
struct SlowSchema {
    started: Arc<Notify>,
    blocked: AtomicBool,
}

#[async_trait]
impl Analyzer for SlowSchema {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn section(&self) -> Section {
        Section::Schema
    }

    async fn analyze(&self, _ctx: &AnalysisContext<'_>) -> AnalyzeResult<SectionData> {
        if !self.blocked.swap(true, Ordering::SeqCst) {
            self.started.notify_one();
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(SectionData::Schema(SchemaInventory::default()))
    }
}

fn slow_scheduler(started: Arc<Notify>) -> Arc<DependencyScheduler> {
    let mut registry = AnalyzerRegistry::with_defaults();
    registry.register(Arc::new(SlowSchema {
        started,
        blocked: AtomicBool::new(false),
    }));
    Arc::new(DependencyScheduler::with_registry(manager_with(Config::default()), registry).unwrap())
}

#[tokio::test]
async fn test_cancelled_run_commits_nothing() {
    let started = Arc::new(Notify::new());
    let scheduler = slow_scheduler(Arc::clone(&started));
    let id = connect(&scheduler, SALES).await;
    let cancel = CancellationToken::new();

    let task = {
        let scheduler = Arc::clone(&scheduler);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            scheduler
                .run_analyzer(RunRequest::new(id, "schema").cancel_token(cancel), &NoopSink)
                .await
        })
    };
    started.notified().await;
    cancel.cancel();

    assert!(matches!(task.await.unwrap(), Err(RuntimeError::Cancelled)));
    assert!(scheduler.sessions().get_result(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_newer_request_supersedes_in_flight_run() {
    let started = Arc::new(Notify::new());
    let scheduler = slow_scheduler(Arc::clone(&started));
    let id = connect(&scheduler, SALES).await;

    let first = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            scheduler
                .run_analyzer(RunRequest::new(id, "schema"), &NoopSink)
                .await
        })
    };
    started.notified().await;

    let second = scheduler
        .run_analyzer(RunRequest::new(id, "schema"), &NoopSink)
        .await
        .unwrap();
    assert!(second.has_section(Section::Schema));
    assert!(matches!(first.await.unwrap(), Err(RuntimeError::Cancelled)));

    let session = scheduler.sessions().get(id).await.unwrap();
    assert_eq!(session.committed_runs(), 1);
}

#[tokio::test]
async fn test_disconnect_removes_session() {
    let scheduler = scheduler();
    let id = connect(&scheduler, SALES).await;
    assert!(scheduler.sessions().disconnect(id).await);
    assert!(!scheduler.sessions().disconnect(id).await);
    assert!(matches!(
        scheduler.sessions().get_result(id).await,
        Err(RuntimeError::SessionNotFound { .. })
    ));
}

#[tokio::test]
async fn test_idle_sessions_are_swept() {
    let mut config = Config::default();
    config.sessions.idle_timeout_secs = 0;
    let manager = manager_with(config);
    let id = manager.connect(SALES, ProviderType::Snapshot).await.unwrap().id;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(manager.sweep_idle().await, vec![id]);
    assert!(manager.is_empty().await);
}

#[tokio::test]
async fn test_active_sessions_survive_sweep() {
    let manager = manager_with(Config::default());
    manager.connect(SALES, ProviderType::Snapshot).await.unwrap();
    assert!(manager.sweep_idle().await.is_empty());
    assert_eq!(manager.len().await, 1);
}

#[tokio::test]
async fn test_background_sweeper_evicts_and_stops() {
    let mut config = Config::default();
    config.sessions.idle_timeout_secs = 0;
    let manager = manager_with(config);
    manager.connect(SALES, ProviderType::Snapshot).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let shutdown = CancellationToken::new();
    let handle = manager.spawn_idle_sweeper(shutdown.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(manager.is_empty().await);

    shutdown.cancel();
    handle.await.unwrap();
}
