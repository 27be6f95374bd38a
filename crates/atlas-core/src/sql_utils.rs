//! Object-name utilities: splitting, qualification and quoting
//!
//! Names in results use `.` separated parts. Bracketed (`[a.b]`) and
//! double-quoted (`"a.b"`) parts may contain dots of their own.

/// Split a possibly qualified object name into its parts.
///
/// Brackets and double quotes are stripped; surrounding whitespace is
/// trimmed from each part.
///
/// # Examples
/// ```
/// use atlas_core::sql_utils::split_name_parts;
/// assert_eq!(split_name_parts("dbo.Orders"), vec!["dbo", "Orders"]);
/// assert_eq!(split_name_parts("[Sales].[dbo].[Order.Lines]"), vec!["Sales", "dbo", "Order.Lines"]);
/// ```
pub fn split_name_parts(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut closer: Option<char> = None;

    for ch in name.chars() {
        match closer {
            Some(c) if ch == c => closer = None,
            Some(_) => current.push(ch),
            None => match ch {
                '[' => closer = Some(']'),
                '"' => closer = Some('"'),
                '`' => closer = Some('`'),
                '.' => parts.push(std::mem::take(&mut current).trim().to_string()),
                _ => current.push(ch),
            },
        }
    }
    parts.push(current.trim().to_string());
    parts
}

/// Count the unquoted `.` separators in a name.
pub fn separator_count(name: &str) -> usize {
    split_name_parts(name).len().saturating_sub(1)
}

/// Qualify a two-part `schema.object` name with a database.
///
/// Names that already carry two or more separators are returned
/// unchanged, as are single-part names and empty databases.
///
/// # Examples
/// ```
/// use atlas_core::sql_utils::qualify_name;
/// assert_eq!(qualify_name("dbo.Customers", "Sales"), "Sales.dbo.Customers");
/// assert_eq!(qualify_name("Hr.dbo.Staff", "Sales"), "Hr.dbo.Staff");
/// ```
pub fn qualify_name(name: &str, database: &str) -> String {
    if database.is_empty() || separator_count(name) != 1 {
        return name.to_string();
    }
    format!("{}.{}", database, name)
}

/// Build the canonical `schema.name` key, or `database.schema.name`
/// when a database is supplied.
pub fn object_key(database: Option<&str>, schema: &str, name: &str) -> String {
    match database {
        Some(db) if !db.is_empty() => format!("{}.{}.{}", db, schema, name),
        _ if schema.is_empty() => name.to_string(),
        _ => format!("{}.{}", schema, name),
    }
}

/// Case-insensitive name comparison.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Quote a SQL identifier by wrapping it in double quotes and doubling
/// embedded quotes.
///
/// # Examples
/// ```
/// use atlas_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("users"), r#""users""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a `schema.object` pair.
pub fn quote_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Escape a SQL string literal value by doubling single quotes.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
