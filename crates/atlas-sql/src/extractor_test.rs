use super::*;
use crate::dialect::{AnsiDialect, DuckDbDialect, MsSqlServerDialect};

fn names(refs: &[ObjectReference]) -> Vec<String> {
    refs.iter().map(|r| r.name.to_string()).collect()
}

#[test]
fn test_extract_from_join_exec() {
    let sql = r#"
        CREATE PROCEDURE dbo.LoadOrders AS
        BEGIN
            INSERT INTO dbo.OrderArchive
            SELECT o.* FROM dbo.Orders o
            INNER JOIN [dbo].[Customers] c ON c.CustomerId = o.CustomerId;
            EXEC dbo.LogRun;
        END
    "#;
    let refs = extract_references(sql);
    assert_eq!(names(&refs), vec!["dbo.Orders", "dbo.Customers", "dbo.LogRun"]);
    assert_eq!(refs[2].kind, ReferenceKind::Execute);
    assert_eq!(refs[0].kind, ReferenceKind::Relation);
}

#[test]
fn test_extract_ignores_comments_and_strings() {
    let sql = r#"
        -- SELECT * FROM dbo.Commented
        /* JOIN dbo.Blocked */
        SELECT 'FROM dbo.InString' AS label FROM dbo.Real
    "#;
    assert_eq!(names(&extract_references(sql)), vec!["dbo.Real"]);
}

#[test]
fn test_extract_skips_variables_and_temp_tables() {
    let sql = "SELECT * FROM @rows; SELECT * FROM #staging; EXEC @rc = dbo.Audit; EXEC sp_executesql @sql";
    assert_eq!(names(&extract_references(sql)), vec!["dbo.Audit"]);
}

#[test]
fn test_extract_multipart_names() {
    let sql = "SELECT * FROM Shared.dbo.Regions r JOIN linked.Hr.dbo.Staff s ON 1 = 1 JOIN Sales..Orders x ON 1 = 1";
    let refs = extract_references(sql);
    assert_eq!(refs.len(), 3);
    assert_eq!(refs[0].name.database(), Some("Shared"));
    assert_eq!(refs[1].name.server(), Some("linked"));
    assert_eq!(refs[2].name.schema(), None);
    assert_eq!(refs[2].name.object(), "Orders");
}

#[test]
fn test_extract_deduplicates() {
    let sql = "SELECT * FROM dbo.T UNION ALL SELECT * FROM dbo.T";
    assert_eq!(extract_references(sql).len(), 1);
}

#[test]
fn test_strip_keeps_offsets() {
    let sql = "a -- x\nb 'it''s' c";
    let stripped = strip_comments_and_strings(sql);
    assert_eq!(stripped.chars().count(), sql.chars().count());
    assert!(stripped.starts_with("a "));
    assert!(stripped.contains('\n'));
    assert!(!stripped.contains("it"));
}

#[test]
fn test_view_references_parse_path() {
    let definition = r#"CREATE VIEW main.recent AS
        WITH latest AS (SELECT * FROM main.orders)
        SELECT * FROM latest JOIN main.customers USING (customer_id)"#;
    let refs = view_references(&DuckDbDialect::new(), definition);
    assert_eq!(names(&refs), vec!["main.orders", "main.customers"]);
}

#[test]
fn test_view_references_regex_fallback() {
    // unparseable vendor syntax still yields references
    let definition = "CREATE VIEW dbo.v WITH SCHEMABINDING AS SELECT * FROM dbo.Orders WITH (NOEXPAND) PIVOT ?? x";
    let refs = view_references(&AnsiDialect::new(), definition);
    assert_eq!(names(&refs), vec!["dbo.Orders"]);
}

#[test]
fn test_view_body() {
    assert_eq!(
        view_body("CREATE OR REPLACE VIEW v AS SELECT 1").trim(),
        "SELECT 1"
    );
    assert_eq!(view_body("SELECT 1"), "SELECT 1");
}

#[test]
fn test_relations_bracketed_mssql() {
    let statements = MsSqlServerDialect::new()
        .parse("SELECT * FROM [Shared].[dbo].[Regions]")
        .unwrap();
    let rels = relations_in(&statements);
    assert_eq!(rels.len(), 1);
    assert_eq!(rels[0].database(), Some("Shared"));
}
