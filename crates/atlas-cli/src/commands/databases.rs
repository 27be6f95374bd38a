//! `atlas databases` command - list what a server-wide run would analyze

use anyhow::{bail, Context, Result};
use atlas_db::{factory_for, ConnectionTarget};
use atlas_runtime::ServerFanoutOrchestrator;
use serde::Serialize;

use crate::cli::{DatabasesArgs, GlobalArgs, OutputFormat};
use crate::commands::common::write_json;
use crate::context::CliContext;

#[derive(Serialize)]
struct DatabaseListing<'a> {
    server: &'a str,
    databases: &'a [String],
    skipped: &'a [String],
}

/// Execute the databases command
pub async fn execute(args: &DatabasesArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CliContext::new(global)?;
    let factory = factory_for(ctx.provider(&args.conn));
    let target = factory
        .resolve_target(
            ConnectionTarget::parse(&args.conn.connection).context("Invalid connection string")?,
        )
        .context("Invalid connection string")?;
    if !target.is_server_mode() {
        bail!(
            "'{}' names a single database; pass a server-level connection",
            args.conn.connection
        );
    }

    let orchestrator =
        ServerFanoutOrchestrator::new(factory.as_ref(), ctx.scheduler.registry(), &ctx.config);
    let discovery = orchestrator
        .discover(&target)
        .await
        .with_context(|| format!("Failed to enumerate databases on '{}'", target.server))?;

    match args.output {
        OutputFormat::Json => write_json(
            &DatabaseListing {
                server: &discovery.server_name,
                databases: &discovery.databases,
                skipped: &discovery.skipped,
            },
            None,
        )?,
        OutputFormat::Summary => {
            println!(
                "Server {}: {} database(s)",
                discovery.server_name,
                discovery.databases.len()
            );
            for name in &discovery.databases {
                println!("  {}", name);
            }
            if !discovery.skipped.is_empty() {
                ctx.verbose(&format!("Skipped: {}", discovery.skipped.join(", ")));
            }
        }
    }
    Ok(())
}
