//! Quality analyzer: structural findings over schema and relationships

use crate::analyzer::Analyzer;
use crate::context::AnalysisContext;
use crate::error::AnalyzeResult;
use crate::relationships::dependency_cycles;
use crate::types::types_compatible;
use async_trait::async_trait;
use atlas_core::dag::QUALITY;
use atlas_core::{
    ObjectType, QualityIssue, RelationshipGraph, SchemaInventory, Section, SectionData, Severity,
};

/// Implicit relationships at or above this confidence are reported
const IMPLICIT_REPORT_CONFIDENCE: f64 = 0.8;

pub struct QualityAnalyzer;

fn issue(
    code: &str,
    severity: Severity,
    schema: &str,
    object: &str,
    object_type: ObjectType,
    message: String,
) -> QualityIssue {
    QualityIssue {
        database: None,
        code: code.to_string(),
        severity,
        schema: schema.to_string(),
        object: object.to_string(),
        object_type,
        column: None,
        message,
        recommendation: None,
    }
}

/// Run every check and sort the findings, most severe first
pub fn check_quality(
    inventory: &SchemaInventory,
    relationships: Option<&RelationshipGraph>,
    wide_table_columns: usize,
) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    missing_primary_keys(inventory, &mut issues);
    unindexed_foreign_keys(inventory, &mut issues);
    foreign_key_type_mismatches(inventory, &mut issues);
    wide_tables(inventory, wide_table_columns, &mut issues);
    if let Some(graph) = relationships {
        undeclared_relationships(graph, &mut issues);
        circular_dependencies(graph, &mut issues);
    }

    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.schema.cmp(&b.schema))
            .then_with(|| a.object.cmp(&b.object))
            .then_with(|| a.code.cmp(&b.code))
    });
    issues
}

fn missing_primary_keys(inventory: &SchemaInventory, issues: &mut Vec<QualityIssue>) {
    for table in inventory.tables.iter().filter(|t| t.primary_key().is_empty()) {
        let mut found = issue(
            "Q001",
            Severity::Warning,
            &table.schema,
            &table.name,
            ObjectType::Table,
            format!("Table {}.{} has no primary key", table.schema, table.name),
        );
        found.recommendation = Some("Declare a primary key".to_string());
        issues.push(found);
    }
}

fn unindexed_foreign_keys(inventory: &SchemaInventory, issues: &mut Vec<QualityIssue>) {
    for fk in &inventory.foreign_keys {
        let supported = inventory.indexes.iter().any(|ix| {
            ix.schema.eq_ignore_ascii_case(&fk.from_schema)
                && ix.table.eq_ignore_ascii_case(&fk.from_table)
                && ix
                    .columns
                    .first()
                    .is_some_and(|c| c.eq_ignore_ascii_case(&fk.from_column))
        });
        if supported {
            continue;
        }
        let mut found = issue(
            "Q002",
            Severity::Warning,
            &fk.from_schema,
            &fk.from_table,
            ObjectType::Table,
            format!(
                "Foreign key column {}.{}.{} has no supporting index",
                fk.from_schema, fk.from_table, fk.from_column
            ),
        );
        found.column = Some(fk.from_column.clone());
        found.recommendation = Some(format!("Create an index leading with {}", fk.from_column));
        issues.push(found);
    }
}

fn foreign_key_type_mismatches(inventory: &SchemaInventory, issues: &mut Vec<QualityIssue>) {
    for fk in &inventory.foreign_keys {
        let from = inventory
            .table(&fk.from_schema, &fk.from_table)
            .and_then(|t| t.column(&fk.from_column));
        let to = inventory
            .table(&fk.to_schema, &fk.to_table)
            .and_then(|t| t.column(&fk.to_column));
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        if types_compatible(&from.data_type, &to.data_type) {
            continue;
        }
        let mut found = issue(
            "Q006",
            Severity::Error,
            &fk.from_schema,
            &fk.from_table,
            ObjectType::Table,
            format!(
                "Foreign key column {} ({}) references {}.{}.{} ({})",
                fk.from_column, from.data_type, fk.to_schema, fk.to_table, fk.to_column, to.data_type
            ),
        );
        found.column = Some(fk.from_column.clone());
        issues.push(found);
    }
}

fn wide_tables(inventory: &SchemaInventory, threshold: usize, issues: &mut Vec<QualityIssue>) {
    if threshold == 0 {
        return;
    }
    for table in inventory.tables.iter().filter(|t| t.columns.len() >= threshold) {
        issues.push(issue(
            "Q004",
            Severity::Info,
            &table.schema,
            &table.name,
            ObjectType::Table,
            format!(
                "Table {}.{} has {} columns",
                table.schema,
                table.name,
                table.columns.len()
            ),
        ));
    }
}

fn undeclared_relationships(graph: &RelationshipGraph, issues: &mut Vec<QualityIssue>) {
    for rel in graph
        .implicit
        .iter()
        .filter(|r| r.confidence >= IMPLICIT_REPORT_CONFIDENCE)
    {
        let mut found = issue(
            "Q003",
            Severity::Info,
            &rel.from_schema,
            &rel.from_table,
            ObjectType::Table,
            format!(
                "{}.{} looks like a reference to {}.{}.{} but no foreign key is declared ({})",
                rel.from_table, rel.from_column, rel.to_schema, rel.to_table, rel.to_column, rel.reason
            ),
        );
        found.column = Some(rel.from_column.clone());
        found.recommendation = Some("Declare the foreign key".to_string());
        issues.push(found);
    }
}

fn circular_dependencies(graph: &RelationshipGraph, issues: &mut Vec<QualityIssue>) {
    for cycle in dependency_cycles(graph) {
        let Some(first) = cycle.first().and_then(|key| graph.node(key)) else {
            continue;
        };
        issues.push(issue(
            "Q005",
            Severity::Warning,
            &first.schema,
            &first.name,
            first.object_type,
            format!("Circular dependency: {}", cycle.join(" -> ")),
        ));
    }
}

#[async_trait]
impl Analyzer for QualityAnalyzer {
    fn name(&self) -> &'static str {
        QUALITY
    }

    fn section(&self) -> Section {
        Section::Quality
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<SectionData> {
        let inventory = ctx.require_schema(QUALITY)?;
        if ctx.relationships().is_none() {
            log::debug!("Quality checks running without relationships; Q003/Q005 skipped");
        }
        let issues = check_quality(
            inventory,
            ctx.relationships(),
            ctx.config().quality.wide_table_columns,
        );
        Ok(SectionData::Quality(issues))
    }
}
