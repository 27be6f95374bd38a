//! `atlas analyze` command - run analyzers against a database or server

use anyhow::{bail, Context, Result};
use atlas_core::AnalyzerDag;
use atlas_runtime::{NoopSink, ProgressSink, RunRequest};

use crate::cli::{AnalyzeArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{parse_list, summary_lines, write_json, BarSink, ExitCode};
use crate::context::CliContext;

/// The analyzers to request, in dependency order.
///
/// Without `force`, analyzers that another requested analyzer already
/// depends on are dropped: the scheduler resolves them anyway.
fn plan_requests(dag: &AnalyzerDag, analyzers: &[String], force: bool) -> Result<Vec<String>> {
    let order = dag.topological_order()?;
    Ok(order
        .into_iter()
        .filter(|name| analyzers.contains(name))
        .filter(|name| {
            force
                || !dag
                    .transitive_dependents(name)
                    .iter()
                    .any(|d| analyzers.contains(d))
        })
        .collect())
}

/// Execute the analyze command
pub async fn execute(args: &AnalyzeArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CliContext::new(global)?;
    let scheduler = &ctx.scheduler;

    let analyzers = match &args.analyzers {
        Some(raw) => parse_list(raw),
        None => scheduler.dag().analyzers(),
    };
    if analyzers.is_empty() {
        bail!("No analyzers selected");
    }
    if let Some(unknown) = analyzers.iter().find(|a| !scheduler.dag().contains(a)) {
        bail!(
            "Unknown analyzer '{}'. Available: {}",
            unknown,
            scheduler.dag().analyzers().join(", ")
        );
    }

    let session = ctx.connect(&args.conn).await?;
    if args.database.is_some() && !session.server_mode {
        eprintln!("[warn] --database is ignored for a single-database connection");
    }

    let bar = (args.output == OutputFormat::Summary && args.out.is_none()).then(BarSink::new);
    let sink: &dyn ProgressSink = match &bar {
        Some(bar) => bar,
        None => &NoopSink,
    };

    let requests = plan_requests(scheduler.dag(), &analyzers, args.force)?;
    ctx.verbose(&format!("Requests: {}", requests.join(", ")));

    let mut last = None;
    for name in &requests {
        ctx.verbose(&format!("Running analyzer '{}'", name));
        let mut request = RunRequest::new(session.id, name.as_str()).force(args.force);
        if let Some(db) = &args.database {
            request = request.database(db.as_str());
        }
        let result = scheduler
            .run_analyzer(request, sink)
            .await
            .with_context(|| format!("Analyzer '{}' failed", name))?;
        last = Some(result);
    }
    if let Some(bar) = &bar {
        bar.finish();
    }
    scheduler.sessions().disconnect(session.id).await;

    let Some(result) = last else {
        return Ok(());
    };

    match (args.output, args.out.as_deref()) {
        (OutputFormat::Json, out) | (OutputFormat::Summary, out @ Some(_)) => {
            write_json(&result, out)?
        }
        (OutputFormat::Summary, None) => {
            for line in summary_lines(&result) {
                println!("{}", line);
            }
        }
    }

    if !result.failed_databases.is_empty() && result.databases.is_empty() {
        eprintln!("Every database failed to analyze");
        return Err(ExitCode(1).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_drops_covered_dependencies() {
        let dag = AnalyzerDag::with_defaults();
        let plan = plan_requests(&dag, &dag.analyzers(), false).unwrap();
        let mut sorted = plan.clone();
        sorted.sort();
        assert_eq!(sorted, names(&["indexing", "quality", "usage"]));

        let plan = plan_requests(&dag, &names(&["schema", "profiling"]), false).unwrap();
        assert_eq!(plan, names(&["profiling"]));
    }

    #[test]
    fn test_forced_plan_keeps_every_analyzer_in_order() {
        let dag = AnalyzerDag::with_defaults();
        let plan = plan_requests(&dag, &names(&["usage", "schema"]), true).unwrap();
        assert_eq!(plan, names(&["schema", "usage"]));
    }
}
