//! Schema analyzer: assembles the catalog inventory

use crate::analyzer::Analyzer;
use crate::context::AnalysisContext;
use crate::error::AnalyzeResult;
use async_trait::async_trait;
use atlas_core::dag::SCHEMA;
use atlas_core::{ColumnInfo, SchemaInventory, Section, SectionData, TableInfo, ViewInfo};
use atlas_db::DbResult;
use std::collections::{BTreeMap, HashMap};

pub struct SchemaAnalyzer;

/// Degrade an optional catalog query to an empty list
pub(crate) fn optional<T>(what: &str, database: Option<&str>, result: DbResult<Vec<T>>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!(
                "Skipping {} for {}: {}",
                what,
                database.unwrap_or("<server>"),
                e
            );
            Vec::new()
        }
    }
}

/// Split a flat column list into tables and the columns of known views.
///
/// Columns whose relation is not a view become tables, in first-seen order.
pub fn build_relations(
    columns: Vec<ColumnInfo>,
    mut views: Vec<ViewInfo>,
) -> (Vec<TableInfo>, Vec<ViewInfo>) {
    let view_index: HashMap<String, usize> = views
        .iter()
        .enumerate()
        .map(|(i, v)| (relation_key(&v.schema, &v.name), i))
        .collect();

    let mut tables: Vec<TableInfo> = Vec::new();
    let mut table_index: BTreeMap<String, usize> = BTreeMap::new();

    for column in columns {
        let key = relation_key(&column.schema, &column.table);
        if let Some(&i) = view_index.get(&key) {
            views[i].columns.push(column);
            continue;
        }
        let idx = *table_index.entry(key).or_insert_with(|| {
            tables.push(TableInfo {
                database: None,
                schema: column.schema.clone(),
                name: column.table.clone(),
                columns: Vec::new(),
            });
            tables.len() - 1
        });
        tables[idx].columns.push(column);
    }

    for table in &mut tables {
        table.columns.sort_by_key(|c| c.ordinal);
    }
    (tables, views)
}

fn relation_key(schema: &str, name: &str) -> String {
    format!("{}.{}", schema, name).to_lowercase()
}

#[async_trait]
impl Analyzer for SchemaAnalyzer {
    fn name(&self) -> &'static str {
        SCHEMA
    }

    fn section(&self) -> Section {
        Section::Schema
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzeResult<SectionData> {
        let provider = ctx.provider();
        let db = ctx.database();

        let columns = provider.columns().await?;
        let views = optional("views", db, provider.views().await);
        let (tables, views) = build_relations(columns, views);

        let inventory = SchemaInventory {
            tables,
            views,
            procedures: optional("procedures", db, provider.procedures().await),
            functions: optional("functions", db, provider.functions().await),
            triggers: optional("triggers", db, provider.triggers().await),
            synonyms: optional("synonyms", db, provider.synonyms().await),
            sequences: optional("sequences", db, provider.sequences().await),
            user_types: optional("user types", db, provider.user_types().await),
            jobs: optional("jobs", db, provider.jobs().await),
            foreign_keys: optional("foreign keys", db, provider.foreign_keys().await),
            indexes: optional("indexes", db, provider.index_catalog().await),
        };

        log::debug!(
            "Schema inventory for {}: {} tables, {} views, {} objects total",
            db.unwrap_or("<server>"),
            inventory.tables.len(),
            inventory.views.len(),
            inventory.object_count()
        );
        Ok(SectionData::Schema(inventory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::column;

    #[test]
    fn test_build_relations_splits_views() {
        let columns = vec![
            column("dbo", "Orders", "Amount", "decimal", false, 2),
            column("dbo", "Orders", "OrderId", "int", true, 1),
            column("dbo", "vOrders", "OrderId", "int", false, 1),
            column("dbo", "Customers", "CustomerId", "int", true, 1),
        ];
        let views = vec![ViewInfo {
            database: None,
            schema: "DBO".into(),
            name: "vorders".into(),
            definition: None,
            columns: vec![],
        }];

        let (tables, views) = build_relations(columns, views);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "Orders");
        assert_eq!(tables[0].columns[0].name, "OrderId");
        assert_eq!(tables[0].primary_key(), vec!["OrderId"]);
        assert_eq!(views[0].columns.len(), 1);
    }
}
