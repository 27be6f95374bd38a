//! Naming-convention relationship inference

use crate::types::types_compatible;
use atlas_core::{ForeignKey, ImplicitRelationship, SchemaInventory, TableInfo};
use std::collections::HashSet;

/// A candidate target: a table with a single-column primary key
struct Target<'a> {
    table: &'a TableInfo,
    pk_column: &'a str,
    pk_type: &'a str,
    /// lowercased table name
    plural: String,
    /// lowercased singular form
    singular: String,
}

/// Primary-key names too generic to identify a table on their own
const GENERIC_KEYS: &[&str] = &["id", "key", "code", "no", "number", "pk"];

/// Suffix variants below the `{Table}Id` family, in decreasing confidence
const WEAK_SUFFIXES: &[(&str, f64)] = &[("key", 0.6), ("no", 0.5), ("number", 0.5), ("code", 0.4)];

/// Singular form of an English plural table name
pub fn singularize(name: &str) -> String {
    let lower = name.to_lowercase();
    if let Some(stem) = lower.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "xes", "ches", "shes", "zes"] {
        if lower.ends_with(suffix) {
            return lower[..lower.len() - 2].to_string();
        }
    }
    if lower.ends_with('s') && !lower.ends_with("ss") && lower.len() > 1 {
        return lower[..lower.len() - 1].to_string();
    }
    lower
}

fn with_suffix(column: &str, stem: &str, suffix: &str) -> bool {
    column == format!("{}{}", stem, suffix) || column == format!("{}_{}", stem, suffix)
}

/// The strongest heuristic matching `column` (lowercased) to `target`
fn best_match(column: &str, target: &Target<'_>) -> Option<(f64, String)> {
    let table = &target.table.name;
    let pk = target.pk_column.to_lowercase();

    if with_suffix(column, &target.plural, "id") {
        return Some((0.9, format!("column name matches {}Id", table)));
    }
    if column == pk && !GENERIC_KEYS.contains(&pk.as_str()) {
        return Some((
            0.9,
            format!("column name matches primary key {}.{}", table, target.pk_column),
        ));
    }
    if target.singular != target.plural && with_suffix(column, &target.singular, "id") {
        return Some((
            0.8,
            format!("column name matches singular form {}Id", target.singular),
        ));
    }
    let fk_prefix = column
        .strip_prefix("fk_")
        .or_else(|| column.strip_prefix("fk"));
    if let Some(rest) = fk_prefix {
        if rest.starts_with(&target.plural) || rest.starts_with(&target.singular) {
            return Some((0.7, format!("column carries FK_{} prefix", table)));
        }
    }
    for (suffix, confidence) in WEAK_SUFFIXES {
        if with_suffix(column, &target.plural, suffix)
            || with_suffix(column, &target.singular, suffix)
        {
            return Some((
                *confidence,
                format!("column name matches {}{}", table, suffix),
            ));
        }
    }
    None
}

fn fk_key(schema: &str, table: &str, column: &str) -> String {
    format!("{}.{}.{}", schema, table, column).to_lowercase()
}

/// Infer relationships from column naming conventions.
///
/// Every non-primary-key column is tested against every table with a
/// single-column primary key; the strongest type-compatible match wins.
/// Columns already covered by a declared foreign key are skipped, as are
/// matches below `min_confidence`.
pub fn detect_implicit(
    inventory: &SchemaInventory,
    explicit: &[ForeignKey],
    min_confidence: f64,
) -> Vec<ImplicitRelationship> {
    let declared: HashSet<String> = explicit
        .iter()
        .map(|fk| fk_key(&fk.from_schema, &fk.from_table, &fk.from_column))
        .collect();

    let targets: Vec<Target<'_>> = inventory
        .tables
        .iter()
        .filter_map(|table| {
            let pk: Vec<_> = table.columns.iter().filter(|c| c.is_primary_key).collect();
            match pk.as_slice() {
                [only] => Some(Target {
                    table,
                    pk_column: &only.name,
                    pk_type: &only.data_type,
                    plural: table.name.to_lowercase(),
                    singular: singularize(&table.name),
                }),
                _ => None,
            }
        })
        .collect();

    let mut found = Vec::new();
    for table in &inventory.tables {
        for column in table.columns.iter().filter(|c| !c.is_primary_key) {
            if declared.contains(&fk_key(&table.schema, &table.name, &column.name)) {
                continue;
            }
            let lower = column.name.to_lowercase();

            let mut best: Option<(f64, String, &Target<'_>)> = None;
            for target in &targets {
                let same_table = target.table.schema.eq_ignore_ascii_case(&table.schema)
                    && target.table.name.eq_ignore_ascii_case(&table.name);
                if same_table && column.name.eq_ignore_ascii_case(target.pk_column) {
                    continue;
                }
                if !types_compatible(&column.data_type, target.pk_type) {
                    continue;
                }
                if let Some((confidence, reason)) = best_match(&lower, target) {
                    if best.as_ref().is_none_or(|(c, _, _)| confidence > *c) {
                        best = Some((confidence, reason, target));
                    }
                }
            }

            if let Some((confidence, reason, target)) = best {
                if confidence < min_confidence {
                    continue;
                }
                found.push(ImplicitRelationship {
                    database: None,
                    from_schema: table.schema.clone(),
                    from_table: table.name.clone(),
                    from_column: column.name.clone(),
                    to_schema: target.table.schema.clone(),
                    to_table: target.table.name.clone(),
                    to_column: target.pk_column.to_string(),
                    confidence,
                    reason,
                });
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{foreign_key, table_with};

    fn inventory(tables: Vec<TableInfo>) -> SchemaInventory {
        SchemaInventory {
            tables,
            ..Default::default()
        }
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("Orders"), "order");
        assert_eq!(singularize("Categories"), "category");
        assert_eq!(singularize("Boxes"), "box");
        assert_eq!(singularize("Address"), "address");
        assert_eq!(singularize("Addresses"), "address");
        assert_eq!(singularize("Staff"), "staff");
    }

    #[test]
    fn test_primary_key_name_match() {
        let inv = inventory(vec![
            table_with("dbo", "Orders", &[("OrderId", "int", true)]),
            table_with(
                "dbo",
                "Invoices",
                &[("InvoiceId", "int", true), ("OrderID", "int", false)],
            ),
        ]);
        let found = detect_implicit(&inv, &[], 0.0);
        assert_eq!(found.len(), 1);
        let rel = &found[0];
        assert_eq!(rel.from_table, "Invoices");
        assert_eq!(rel.from_column, "OrderID");
        assert_eq!(rel.to_table, "Orders");
        assert_eq!(rel.to_column, "OrderId");
        assert_eq!(rel.confidence, 0.9);
    }

    #[test]
    fn test_singular_form_match() {
        let inv = inventory(vec![
            table_with("dbo", "Categories", &[("Id", "int", true)]),
            table_with(
                "dbo",
                "Products",
                &[("Id", "int", true), ("Category_Id", "bigint", false)],
            ),
        ]);
        let found = detect_implicit(&inv, &[], 0.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_table, "Categories");
        assert_eq!(found[0].confidence, 0.8);
    }

    #[test]
    fn test_weak_suffixes_and_fk_prefix() {
        let inv = inventory(vec![
            table_with("dbo", "Region", &[("Id", "int", true)]),
            table_with("dbo", "Vendor", &[("Id", "varchar(10)", true)]),
            table_with(
                "dbo",
                "Shipments",
                &[
                    ("Id", "int", true),
                    ("FK_Region", "int", false),
                    ("VendorCode", "varchar(10)", false),
                ],
            ),
        ]);
        let found = detect_implicit(&inv, &[], 0.0);
        let region = found.iter().find(|r| r.from_column == "FK_Region").unwrap();
        assert_eq!(region.confidence, 0.7);
        let vendor = found.iter().find(|r| r.from_column == "VendorCode").unwrap();
        assert_eq!(vendor.confidence, 0.4);
    }

    #[test]
    fn test_incompatible_types_suppressed() {
        let inv = inventory(vec![
            table_with("dbo", "Orders", &[("OrderId", "int", true)]),
            table_with(
                "dbo",
                "Notes",
                &[("NoteId", "int", true), ("OrderId", "varchar(20)", false)],
            ),
        ]);
        assert!(detect_implicit(&inv, &[], 0.0).is_empty());
    }

    #[test]
    fn test_declared_fk_suppressed() {
        let inv = inventory(vec![
            table_with("dbo", "Customers", &[("CustomerId", "int", true)]),
            table_with(
                "dbo",
                "Orders",
                &[("OrderId", "int", true), ("CustomerId", "int", false)],
            ),
        ]);
        let fks = vec![foreign_key(
            ("dbo", "Orders", "CustomerId"),
            ("dbo", "Customers", "CustomerId"),
        )];
        assert!(detect_implicit(&inv, &fks, 0.0).is_empty());
        assert_eq!(detect_implicit(&inv, &[], 0.0).len(), 1);
    }

    #[test]
    fn test_min_confidence_filter() {
        let inv = inventory(vec![
            table_with("dbo", "Vendor", &[("Id", "int", true)]),
            table_with("dbo", "Bills", &[("Id", "int", true), ("VendorNo", "int", false)]),
        ]);
        assert_eq!(detect_implicit(&inv, &[], 0.0).len(), 1);
        assert!(detect_implicit(&inv, &[], 0.6).is_empty());
    }

    #[test]
    fn test_self_reference_allowed() {
        let inv = inventory(vec![table_with(
            "dbo",
            "Employees",
            &[("EmployeeId", "int", true), ("Manager_EmployeeId", "int", false)],
        )]);
        // no heuristic covers a role-prefixed column
        assert!(detect_implicit(&inv, &[], 0.0).is_empty());
    }
}
