//! Relationships analyzer: declared keys, inferred keys and object dependencies
//!
//! The builder combines three sources into one [`RelationshipGraph`]:
//! declared foreign keys, naming-convention matches, and dependencies read
//! from the engine catalog, object definition text and synonym targets.

mod graph;
mod implicit;
mod textual;

pub use graph::{dependency_cycles, ObjectGraph};
pub use implicit::{detect_implicit, singularize};
pub use textual::JOB_SCHEMA;

use crate::analyzer::Analyzer;
use crate::context::AnalysisContext;
use crate::error::AnalyzeResult;
use crate::schema::optional;
use async_trait::async_trait;
use atlas_core::catalog::CatalogDependency;
use atlas_core::dag::RELATIONSHIPS;
use atlas_core::{
    DependencyNode, ObjectType, RelationshipGraph, SchemaInventory, Section, SectionData,
};
use atlas_sql::{dialect_for_engine, SqlDialect};
use textual::{DependencyCollector, ObjectLookup};

/// Builds the relationship graph for one database
pub struct DependencyGraphBuilder<'a> {
    inventory: &'a SchemaInventory,
    database: Option<&'a str>,
    dialect: &'a dyn SqlDialect,
    min_confidence: f64,
    catalog_dependencies: Vec<CatalogDependency>,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(
        inventory: &'a SchemaInventory,
        database: Option<&'a str>,
        dialect: &'a dyn SqlDialect,
    ) -> Self {
        Self {
            inventory,
            database,
            dialect,
            min_confidence: 0.0,
            catalog_dependencies: Vec::new(),
        }
    }

    /// Drop implicit relationships below this confidence
    pub fn min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Engine-reported dependencies, preferred over text-derived ones
    pub fn catalog_dependencies(mut self, rows: Vec<CatalogDependency>) -> Self {
        self.catalog_dependencies = rows;
        self
    }

    pub fn build(self) -> RelationshipGraph {
        let inventory = self.inventory;
        let explicit = inventory.foreign_keys.clone();
        let implicit = detect_implicit(inventory, &explicit, self.min_confidence);

        let lookup = ObjectLookup::new(inventory);
        let mut collector = DependencyCollector::new(&lookup, self.database);
        collector.add_catalog(&self.catalog_dependencies);
        collector.add_definitions(inventory, self.dialect);
        collector.add_synonyms(inventory);
        let dependencies = collector.finish();

        let mut graph = ObjectGraph::new();
        add_inventory_nodes(&mut graph, inventory);
        graph.add_foreign_keys(&explicit);
        graph.add_dependencies(&dependencies);
        let nodes = graph.into_nodes();

        log::debug!(
            "Relationship graph for {}: {} explicit, {} implicit, {} dependencies, {} nodes",
            self.database.unwrap_or("<server>"),
            explicit.len(),
            implicit.len(),
            dependencies.len(),
            nodes.len()
        );

        RelationshipGraph {
            explicit,
            implicit,
            dependencies,
            nodes,
        }
    }
}

fn add_inventory_nodes(graph: &mut ObjectGraph, inventory: &SchemaInventory) {
    let objects = inventory
        .tables
        .iter()
        .map(|t| (t.schema.as_str(), t.name.as_str(), ObjectType::Table))
        .chain(
            inventory
                .views
                .iter()
                .map(|v| (v.schema.as_str(), v.name.as_str(), ObjectType::View)),
        )
        .chain(
            inventory
                .procedures
                .iter()
                .map(|r| (r.schema.as_str(), r.name.as_str(), ObjectType::Procedure)),
        )
        .chain(
            inventory
                .functions
                .iter()
                .map(|r| (r.schema.as_str(), r.name.as_str(), ObjectType::Function)),
        )
        .chain(
            inventory
                .triggers
                .iter()
                .map(|t| (t.schema.as_str(), t.name.as_str(), ObjectType::Trigger)),
        )
        .chain(
            inventory
                .synonyms
                .iter()
                .map(|s| (s.schema.as_str(), s.name.as_str(), ObjectType::Synonym)),
        )
        .chain(
            inventory
                .jobs
                .iter()
                .map(|j| (JOB_SCHEMA, j.name.as_str(), ObjectType::Job)),
        );

    for (schema, name, object_type) in objects {
        graph.add_node(DependencyNode::new(schema, name, object_type));
    }
}

pub struct RelationshipsAnalyzer;

#[async_trait]
impl Analyzer for RelationshipsAnalyzer {
    fn name(&self) -> &'static str {
        RELATIONSHIPS
    }

    fn section(&self) -> Section {
        Section::Relationships
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<SectionData> {
        let inventory = ctx.require_schema(RELATIONSHIPS)?;
        let provider = ctx.provider();
        let catalog = optional(
            "object dependencies",
            ctx.database(),
            provider.object_dependencies().await,
        );

        let dialect = dialect_for_engine(provider.engine());
        let graph = DependencyGraphBuilder::new(inventory, ctx.database(), dialect.as_ref())
            .min_confidence(ctx.config().relationships.min_confidence)
            .catalog_dependencies(catalog)
            .build();
        Ok(SectionData::Relationships(graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::test_utils::{catalog_for, provider_for, run_analyzer, sales_inventory};
    use atlas_core::{AnalysisResult, Config};

    #[tokio::test]
    async fn test_requires_schema() {
        let provider = provider_for("Sales", Default::default()).await;
        let prior = AnalysisResult::for_database("Sales");
        let err = run_analyzer(&RelationshipsAnalyzer, provider, &prior, &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::PrecedenceViolation { .. }));
    }

    #[tokio::test]
    async fn test_sales_graph() {
        let inventory = sales_inventory();
        let provider = provider_for("Sales", catalog_for(&inventory)).await;
        let mut prior = AnalysisResult::for_database("Sales");
        prior.schema = Some(inventory);

        let SectionData::Relationships(graph) =
            run_analyzer(&RelationshipsAnalyzer, provider, &prior, &Config::default())
                .await
                .unwrap()
        else {
            panic!("expected relationships");
        };

        assert_eq!(graph.explicit.len(), 1);
        assert_eq!(graph.implicit.len(), 1);
        assert_eq!(graph.implicit[0].from_table, "Invoices");
        // 3 tables, 1 view, 2 procedures
        assert_eq!(graph.nodes.len(), 6);

        let customers = graph.node("dbo.Customers").unwrap();
        assert!(customers.referenced_by.contains("dbo.Orders"));
        assert!(customers.referenced_by.contains("dbo.vCustomerOrders"));
        assert_eq!(
            customers.transitive_impact,
            vec!["dbo.Orders", "dbo.usp_Report", "dbo.vCustomerOrders"]
        );
        assert_eq!(graph.nodes[0].key, "dbo.Customers");
    }
}
