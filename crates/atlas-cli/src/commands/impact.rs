//! `atlas impact` command - blast radius of one object

use anyhow::{Context, Result};
use atlas_core::{DependencyNode, RelationshipGraph};
use atlas_runtime::{NoopSink, RunRequest};

use crate::cli::{GlobalArgs, ImpactArgs, OutputFormat};
use crate::commands::common::{write_json, ExitCode};
use crate::context::CliContext;

/// Find a node by `schema.name` or `database.schema.name`
fn find_node<'a>(graph: &'a RelationshipGraph, object: &str) -> Option<&'a DependencyNode> {
    if let Some(node) = graph.node(object) {
        return Some(node);
    }
    let parts: Vec<&str> = object.split('.').collect();
    match parts.as_slice() {
        [schema, name] => graph.node_for(None, schema, name),
        [database, schema, name] => graph.node_for(Some(*database), schema, name),
        _ => None,
    }
}

/// Execute the impact command
pub async fn execute(args: &ImpactArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CliContext::new(global)?;
    let session = ctx.connect(&args.conn).await?;

    let result = ctx
        .scheduler
        .run_analyzer(RunRequest::new(session.id, "relationships"), &NoopSink)
        .await
        .context("Failed to build the dependency graph")?;
    ctx.scheduler.sessions().disconnect(session.id).await;

    let Some(node) = result
        .relationships
        .as_ref()
        .and_then(|g| find_node(g, &args.object))
    else {
        eprintln!("Object '{}' not found", args.object);
        return Err(ExitCode(1).into());
    };

    match args.output {
        OutputFormat::Json => write_json(node, None)?,
        OutputFormat::Summary => {
            println!(
                "{} ({}) importance {:.1}",
                node.key, node.object_type, node.importance_score
            );
            if let Some(db) = &node.external_database {
                println!("  external: lives in {}", db);
            }
            println!("  depends on ({}):", node.depends_on.len());
            for key in &node.depends_on {
                println!("    {}", key);
            }
            println!("  referenced by ({}):", node.referenced_by.len());
            for key in &node.referenced_by {
                println!("    {}", key);
            }
            println!("  transitive impact ({}):", node.transitive_impact.len());
            for key in &node.transitive_impact {
                println!("    {}", key);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::ObjectType;

    #[test]
    fn test_find_node_by_two_or_three_parts() {
        let mut node = DependencyNode::new("dbo", "Orders", ObjectType::Table);
        node.database = Some("Sales".into());
        node.key = "Sales.dbo.Orders".into();
        let graph = RelationshipGraph {
            nodes: vec![node],
            ..Default::default()
        };

        assert!(find_node(&graph, "sales.dbo.orders").is_some());
        assert!(find_node(&graph, "dbo.Orders").is_some());
        assert!(find_node(&graph, "Hr.dbo.Orders").is_none());
        assert!(find_node(&graph, "Orders").is_none());
    }
}
