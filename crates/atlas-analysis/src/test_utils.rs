//! Shared fixture builders for analyzer tests

use crate::analyzer::Analyzer;
use crate::context::AnalysisContext;
use crate::error::AnalyzeResult;
use atlas_core::{
    AnalysisResult, ColumnInfo, Config, ForeignKey, IndexDefinition, RoutineInfo, SchemaInventory,
    SectionData, TableInfo, ViewInfo,
};
use atlas_db::{
    CatalogProvider, CatalogSnapshot, ConnectionTarget, DatabaseSnapshot, ProviderFactory,
    ServerSnapshot, SnapshotFactory,
};
use std::sync::Arc;

pub fn column(
    schema: &str,
    table: &str,
    name: &str,
    data_type: &str,
    is_primary_key: bool,
    ordinal: i32,
) -> ColumnInfo {
    ColumnInfo {
        database: None,
        schema: schema.to_string(),
        table: table.to_string(),
        name: name.to_string(),
        data_type: data_type.to_string(),
        is_nullable: !is_primary_key,
        is_primary_key,
        ordinal,
    }
}

pub fn table(schema: &str, name: &str, columns: Vec<ColumnInfo>) -> TableInfo {
    TableInfo {
        database: None,
        schema: schema.to_string(),
        name: name.to_string(),
        columns,
    }
}

/// Table from `(column, type, is_pk)` triples
pub fn table_with(schema: &str, name: &str, cols: &[(&str, &str, bool)]) -> TableInfo {
    let columns = cols
        .iter()
        .enumerate()
        .map(|(i, (col, ty, pk))| column(schema, name, col, ty, *pk, i as i32 + 1))
        .collect();
    table(schema, name, columns)
}

pub fn foreign_key(from: (&str, &str, &str), to: (&str, &str, &str)) -> ForeignKey {
    ForeignKey {
        database: None,
        name: Some(format!("FK_{}_{}", from.1, to.1)),
        from_schema: from.0.to_string(),
        from_table: from.1.to_string(),
        from_column: from.2.to_string(),
        to_schema: to.0.to_string(),
        to_table: to.1.to_string(),
        to_column: to.2.to_string(),
    }
}

pub fn view(schema: &str, name: &str, definition: &str) -> ViewInfo {
    ViewInfo {
        database: None,
        schema: schema.to_string(),
        name: name.to_string(),
        definition: Some(definition.to_string()),
        columns: Vec::new(),
    }
}

pub fn routine(schema: &str, name: &str, definition: &str) -> RoutineInfo {
    RoutineInfo {
        database: None,
        schema: schema.to_string(),
        name: name.to_string(),
        definition: Some(definition.to_string()),
    }
}

pub fn index(schema: &str, table: &str, name: &str, columns: &[&str]) -> IndexDefinition {
    IndexDefinition {
        database: None,
        schema: schema.to_string(),
        table: table.to_string(),
        name: name.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        included_columns: Vec::new(),
        is_unique: false,
        is_primary_key: false,
        is_clustered: false,
    }
}

/// The catalog snapshot a provider would need to return `inventory`
pub fn catalog_for(inventory: &SchemaInventory) -> CatalogSnapshot {
    let mut columns: Vec<ColumnInfo> = inventory
        .tables
        .iter()
        .flat_map(|t| t.columns.iter().cloned())
        .collect();
    columns.extend(inventory.views.iter().flat_map(|v| v.columns.iter().cloned()));

    CatalogSnapshot {
        columns,
        foreign_keys: inventory.foreign_keys.clone(),
        indexes: inventory.indexes.clone(),
        views: inventory
            .views
            .iter()
            .map(|v| ViewInfo {
                columns: Vec::new(),
                ..v.clone()
            })
            .collect(),
        procedures: inventory.procedures.clone(),
        functions: inventory.functions.clone(),
        triggers: inventory.triggers.clone(),
        synonyms: inventory.synonyms.clone(),
        sequences: inventory.sequences.clone(),
        user_types: inventory.user_types.clone(),
        jobs: inventory.jobs.clone(),
        ..Default::default()
    }
}

/// A snapshot provider scoped to one database
pub async fn provider_for(database: &str, catalog: CatalogSnapshot) -> Arc<dyn CatalogProvider> {
    let server = ServerSnapshot {
        server_name: "test-server".to_string(),
        databases: vec![DatabaseSnapshot::new(database, catalog)],
    };
    let target = ConnectionTarget {
        server: "test-server".to_string(),
        database: Some(database.to_string()),
        options: Default::default(),
    };
    match SnapshotFactory::from_snapshot(server).connect(&target).await {
        Ok(provider) => provider,
        Err(e) => panic!("snapshot fixture failed to connect: {e}"),
    }
}

/// Run one analyzer against a provider and prior result
pub async fn run_analyzer(
    analyzer: &dyn Analyzer,
    provider: Arc<dyn CatalogProvider>,
    prior: &AnalysisResult,
    config: &Config,
) -> AnalyzeResult<SectionData> {
    let ctx = AnalysisContext::new(provider, prior, config);
    analyzer.analyze(&ctx).await
}

/// Orders/Customers/Invoices sample used across analyzer tests
pub fn sales_inventory() -> SchemaInventory {
    SchemaInventory {
        tables: vec![
            table_with(
                "dbo",
                "Customers",
                &[("CustomerId", "int", true), ("Name", "nvarchar(100)", false)],
            ),
            table_with(
                "dbo",
                "Orders",
                &[
                    ("OrderId", "int", true),
                    ("CustomerId", "int", false),
                    ("Total", "decimal(18,2)", false),
                ],
            ),
            table_with(
                "dbo",
                "Invoices",
                &[("InvoiceId", "int", true), ("OrderID", "int", false)],
            ),
        ],
        views: vec![view(
            "dbo",
            "vCustomerOrders",
            "CREATE VIEW dbo.vCustomerOrders AS SELECT c.Name, o.Total FROM dbo.Customers c JOIN dbo.Orders o ON o.CustomerId = c.CustomerId",
        )],
        procedures: vec![routine(
            "dbo",
            "usp_Report",
            "CREATE PROCEDURE dbo.usp_Report AS SELECT * FROM dbo.vCustomerOrders; EXEC dbo.usp_Audit",
        ), routine("dbo", "usp_Audit", "CREATE PROCEDURE dbo.usp_Audit AS SELECT 1")],
        foreign_keys: vec![foreign_key(
            ("dbo", "Orders", "CustomerId"),
            ("dbo", "Customers", "CustomerId"),
        )],
        ..Default::default()
    }
}
