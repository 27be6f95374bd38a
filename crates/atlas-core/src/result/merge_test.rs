use super::*;
use crate::result::indexing::IndexUsage;
use crate::result::relationships::{DependencyNode, DependencySource, ObjectDependency};
use crate::result::schema::{ColumnInfo, IndexDefinition, ObjectType, TableInfo};
use crate::result::DatabaseFailure;
use std::collections::BTreeSet;

fn table(schema: &str, name: &str) -> TableInfo {
    TableInfo {
        database: None,
        schema: schema.to_string(),
        name: name.to_string(),
        columns: vec![ColumnInfo {
            database: None,
            schema: schema.to_string(),
            table: name.to_string(),
            name: "Id".to_string(),
            data_type: "int".to_string(),
            is_nullable: false,
            is_primary_key: true,
            ordinal: 1,
        }],
    }
}

fn schema_fragment(db: &str, tables: &[&str]) -> AnalysisResult {
    let mut result = AnalysisResult::for_database(db);
    result.schema = Some(SchemaInventory {
        tables: tables.iter().map(|t| table("dbo", t)).collect(),
        ..Default::default()
    });
    result
}

fn index_fragment(db: &str, names: &[&str]) -> AnalysisResult {
    let mut result = AnalysisResult::for_database(db);
    result.indexes = Some(IndexAnalysis {
        inventory: names
            .iter()
            .map(|n| {
                IndexUsage::from_definition(IndexDefinition {
                    database: None,
                    schema: "dbo".to_string(),
                    table: "Orders".to_string(),
                    name: n.to_string(),
                    columns: vec!["CustomerId".to_string()],
                    included_columns: vec![],
                    is_unique: false,
                    is_primary_key: false,
                    is_clustered: false,
                })
            })
            .collect(),
        recommendations: vec![],
        telemetry_available: true,
    });
    result
}

fn graph_fragment(db: &str) -> AnalysisResult {
    let mut orders = DependencyNode::new("dbo", "Orders", ObjectType::Table);
    let mut view = DependencyNode::new("dbo", "vOrders", ObjectType::View);
    view.depends_on.insert("dbo.Orders".to_string());
    view.depends_on.insert("Shared.dbo.Customers".to_string());
    orders.referenced_by.insert("dbo.vOrders".to_string());
    orders.transitive_impact = vec!["dbo.vOrders".to_string()];

    let mut result = AnalysisResult::for_database(db);
    result.relationships = Some(RelationshipGraph {
        explicit: vec![],
        implicit: vec![],
        dependencies: vec![ObjectDependency {
            database: None,
            from_schema: "dbo".to_string(),
            from_name: "vOrders".to_string(),
            from_type: ObjectType::View,
            to_schema: "dbo".to_string(),
            to_name: "Customers".to_string(),
            to_type: ObjectType::External,
            to_database: Some("Shared".to_string()),
            is_cross_database: true,
            source: DependencySource::Text,
        }],
        nodes: vec![orders, view, DependencyNode::external("Shared", "dbo", "Customers")],
    });
    result
}

fn shared_fragment() -> AnalysisResult {
    let mut result = AnalysisResult::for_database("Shared");
    result.relationships = Some(RelationshipGraph {
        nodes: vec![DependencyNode::new("dbo", "Customers", ObjectType::Table)],
        ..Default::default()
    });
    result
}

fn node_keys(result: &AnalysisResult) -> Vec<String> {
    result
        .relationships
        .as_ref()
        .unwrap()
        .nodes
        .iter()
        .map(|n| n.key.to_lowercase())
        .collect()
}

fn table_names(result: &AnalysisResult) -> Vec<String> {
    result
        .schema
        .as_ref()
        .unwrap()
        .tables
        .iter()
        .map(|t| format!("{}.{}", t.database.as_deref().unwrap_or("-"), t.name))
        .collect()
}

#[test]
fn test_append_database_stamps_rows() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, schema_fragment("Sales", &["Orders"]), "Sales");
    append_database(&mut agg, schema_fragment("Hr", &["Staff"]), "Hr");

    assert_eq!(table_names(&agg), vec!["Sales.Orders", "Hr.Staff"]);
    let column = &agg.schema.as_ref().unwrap().tables[1].columns[0];
    assert_eq!(column.database.as_deref(), Some("Hr"));
}

#[test]
fn test_append_qualifies_graph_keys() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, graph_fragment("Sales"), "Sales");

    let graph = agg.relationships.as_ref().unwrap();
    let orders = graph.node("Sales.dbo.Orders").unwrap();
    assert!(orders.referenced_by.contains("Sales.dbo.vOrders"));
    assert_eq!(orders.transitive_impact, vec!["Sales.dbo.vOrders"]);
    // Already three-part keys are untouched
    assert!(graph.node("Shared.dbo.Customers").is_some());
}

#[test]
fn test_replace_database_twice_produces_no_duplicates() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, index_fragment("Sales", &["IX_A"]), "Sales");
    append_database(&mut agg, index_fragment("Hr", &["IX_H"]), "Hr");

    let refreshed = index_fragment("Sales", &["IX_A", "IX_B"]);
    replace_database(&mut agg, refreshed.clone(), "Sales", &[Section::Indexes]);
    replace_database(&mut agg, refreshed, "Sales", &[Section::Indexes]);

    let names: Vec<String> = agg
        .indexes
        .as_ref()
        .unwrap()
        .inventory
        .iter()
        .map(|i| format!("{}.{}", i.index.database.as_deref().unwrap(), i.index.name))
        .collect();
    assert_eq!(names, vec!["Hr.IX_H", "Sales.IX_A", "Sales.IX_B"]);
}

#[test]
fn test_replace_database_ignores_unlisted_sections() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, schema_fragment("Sales", &["Orders"]), "Sales");

    let mut fragment = schema_fragment("Sales", &["Invoices"]);
    fragment.indexes = index_fragment("Sales", &["IX_A"]).indexes;
    replace_database(&mut agg, fragment, "Sales", &[Section::Indexes]);

    assert_eq!(table_names(&agg), vec!["Sales.Orders"]);
    assert!(agg.indexes.is_some());
}

#[test]
fn test_extract_database_seeds_completed_sections() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, schema_fragment("Sales", &["Orders"]), "Sales");
    append_database(&mut agg, index_fragment("Hr", &["IX_H"]), "Hr");
    let mut clean = AnalysisResult::for_database("Hr");
    clean.quality_issues = Some(Vec::new());
    append_database(&mut agg, clean, "Hr");

    let seeded = extract_database(&agg, "Sales");
    assert!(seeded.schema.is_some());
    assert!(seeded.indexes.is_none());
    assert!(seeded.quality_issues.is_none());
    assert_eq!(seeded.target, "Sales");

    let hr = extract_database(&agg, "hr");
    assert!(hr.schema.is_none());
    assert_eq!(hr.indexes.unwrap().inventory.len(), 1);
    // ran for Hr and found nothing
    assert_eq!(hr.quality_issues, Some(Vec::new()));
}

#[test]
fn test_clear_database_forgets_completion() {
    let mut agg = AnalysisResult::for_server("srv");
    let mut clean = AnalysisResult::for_database("Hr");
    clean.quality_issues = Some(Vec::new());
    append_database(&mut agg, clean, "Hr");
    assert!(agg.is_completed("HR", Section::Quality));

    clear_database(&mut agg, "Hr", &[Section::Quality]);
    assert!(!agg.is_completed("Hr", Section::Quality));
    assert!(extract_database(&agg, "Hr").quality_issues.is_none());
}

#[test]
fn test_replace_sections_carries_completion() {
    let mut existing = AnalysisResult::for_server("srv");
    append_database(&mut existing, schema_fragment("Gone", &["T"]), "Gone");
    append_database(&mut existing, index_fragment("Sales", &["IX_A"]), "Sales");

    let mut incoming = AnalysisResult::for_server("srv");
    append_database(&mut incoming, schema_fragment("Sales", &["Orders"]), "Sales");
    incoming.databases = vec!["Sales".to_string()];

    replace_sections_if_nonempty(&mut existing, incoming);
    assert!(existing.is_completed("Sales", Section::Schema));
    assert!(existing.is_completed("Sales", Section::Indexes));
    assert!(!existing.is_completed("Gone", Section::Schema));
    assert!(!existing.completed.contains_key("gone"));
}

#[test]
fn test_clear_database_keeps_other_rows() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, schema_fragment("Sales", &["Orders"]), "Sales");
    append_database(&mut agg, schema_fragment("Hr", &["Staff"]), "Hr");

    clear_database(&mut agg, "Sales", &[Section::Schema, Section::Usage]);
    assert_eq!(table_names(&agg), vec!["Hr.Staff"]);
    assert!(agg.usage.is_none());
}

#[test]
fn test_replace_sections_keeps_sections_not_supplied() {
    let mut existing = AnalysisResult::for_server("srv");
    append_database(&mut existing, schema_fragment("Sales", &["Orders"]), "Sales");
    append_database(&mut existing, index_fragment("Sales", &["IX_A"]), "Sales");
    existing.databases = vec!["Sales".to_string()];

    let mut incoming = AnalysisResult::for_server("srv");
    append_database(&mut incoming, schema_fragment("Sales", &["Orders", "Invoices"]), "Sales");
    incoming.databases = vec!["Sales".to_string()];

    replace_sections_if_nonempty(&mut existing, incoming);
    assert_eq!(table_names(&existing), vec!["Sales.Orders", "Sales.Invoices"]);
    assert_eq!(existing.indexes.as_ref().unwrap().inventory.len(), 1);
}

#[test]
fn test_replace_sections_keeps_existing_when_incoming_empty() {
    let mut existing = AnalysisResult::for_server("srv");
    append_database(&mut existing, schema_fragment("Sales", &["Orders"]), "Sales");
    existing.databases = vec!["Sales".to_string()];

    let mut incoming = AnalysisResult::for_server("srv");
    incoming.schema = Some(SchemaInventory::default());
    incoming.databases = vec![];
    incoming.failed_databases = vec![DatabaseFailure {
        database: "Sales".to_string(),
        error: "login failed".to_string(),
    }];

    replace_sections_if_nonempty(&mut existing, incoming);
    assert_eq!(table_names(&existing), vec!["Sales.Orders"]);
    assert_eq!(existing.failed_databases.len(), 1);
}

#[test]
fn test_replace_sections_prunes_vanished_databases() {
    let mut existing = AnalysisResult::for_server("srv");
    append_database(&mut existing, index_fragment("OldName", &["IX_A"]), "OldName");
    append_database(&mut existing, index_fragment("Hr", &["IX_H"]), "Hr");

    let mut incoming = AnalysisResult::for_server("srv");
    append_database(&mut incoming, schema_fragment("NewName", &["Orders"]), "NewName");
    incoming.databases = vec!["NewName".to_string(), "Hr".to_string()];

    replace_sections_if_nonempty(&mut existing, incoming);
    let inventory = &existing.indexes.as_ref().unwrap().inventory;
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].index.name, "IX_H");
}

#[test]
fn test_reclassify_external_when_database_analyzed() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, graph_fragment("Sales"), "Sales");
    agg.databases = vec!["Sales".to_string(), "Shared".to_string()];

    assert_eq!(reclassify_external(&mut agg), 1);
    let graph = agg.relationships.as_ref().unwrap();
    assert!(!graph.dependencies[0].is_cross_database);
    assert!(graph
        .node("Shared.dbo.Customers")
        .unwrap()
        .external_database
        .is_none());
}

#[test]
fn test_reclassify_external_keeps_unscanned_databases() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, graph_fragment("Sales"), "Sales");
    agg.databases = vec!["Sales".to_string()];

    assert_eq!(reclassify_external(&mut agg), 0);
    let graph = agg.relationships.as_ref().unwrap();
    assert!(graph.dependencies[0].is_cross_database);
    assert_eq!(
        graph.node("Shared.dbo.Customers").unwrap().external_database.as_deref(),
        Some("Shared")
    );
}

#[test]
fn test_reclassify_folds_placeholder_into_analyzed_node() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, graph_fragment("Sales"), "Sales");
    append_database(&mut agg, shared_fragment(), "Shared");
    agg.databases = vec!["Sales".to_string(), "Shared".to_string()];
    reclassify_external(&mut agg);

    let mut keys = node_keys(&agg);
    let total = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), total);
    assert_eq!(total, 3);

    let graph = agg.relationships.as_ref().unwrap();
    let customers = graph.node("Shared.dbo.Customers").unwrap();
    assert_eq!(customers.object_type, ObjectType::Table);
    assert_eq!(customers.database.as_deref(), Some("Shared"));
    assert!(customers.external_database.is_none());
    assert!(customers.referenced_by.contains("Sales.dbo.vOrders"));
    assert_eq!(customers.transitive_impact, vec!["Sales.dbo.vOrders"]);
    assert_eq!(customers.importance_score, 3.0);
}

#[test]
fn test_reclassify_shares_one_placeholder_between_databases() {
    let mut agg = AnalysisResult::for_server("srv");
    append_database(&mut agg, graph_fragment("Sales"), "Sales");
    append_database(&mut agg, graph_fragment("Hr"), "Hr");
    agg.databases = vec!["Sales".to_string(), "Hr".to_string()];
    reclassify_external(&mut agg);

    let graph = agg.relationships.as_ref().unwrap();
    let shared: Vec<_> = graph
        .nodes
        .iter()
        .filter(|n| n.key.eq_ignore_ascii_case("Shared.dbo.Customers"))
        .collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].external_database.as_deref(), Some("Shared"));
    assert_eq!(
        shared[0].referenced_by,
        BTreeSet::from(["Hr.dbo.vOrders".to_string(), "Sales.dbo.vOrders".to_string()])
    );

    // Dropping both databases' graph rows in turn never leaves a dangling edge
    for db in ["Sales", "Hr"] {
        clear_database(&mut agg, db, &[Section::Relationships]);
        reclassify_external(&mut agg);
        let graph = agg.relationships.as_ref().unwrap();
        for node in &graph.nodes {
            for target in &node.depends_on {
                assert!(graph.node(target).is_some(), "{} -> {}", node.key, target);
            }
        }
    }
    assert!(agg.relationships.as_ref().unwrap().nodes.is_empty());
}
