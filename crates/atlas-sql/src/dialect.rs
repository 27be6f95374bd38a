//! SQL dialect selection per engine

use sqlparser::ast::Statement;
use sqlparser::dialect::{
    Dialect, DuckDbDialect as SqlParserDuckDb, GenericDialect, MsSqlDialect,
    PostgreSqlDialect,
};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        if sql.trim().is_empty() {
            return Err(SqlError::EmptySql);
        }
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let message = e.to_string();
            let (line, column) = parse_location_from_error(&message);
            SqlError::ParseError {
                message,
                line,
                column,
            }
        })
    }

    /// Get the dialect name
    fn name(&self) -> &'static str;
}

/// Pull "Line: N, Column: M" out of a sqlparser error message.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let number_after = |label: &str| -> Option<usize> {
        let start = msg.find(label)? + label.len();
        let digits: String = msg[start..]
            .chars()
            .skip_while(|c| c.is_whitespace())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    };
    match (number_after("Line:"), number_after("Column:")) {
        (Some(line), Some(column)) => (line, column),
        _ => (0, 0),
    }
}

macro_rules! dialect {
    ($name:ident, $inner:ident, $label:literal) => {
        pub struct $name {
            dialect: $inner,
        }

        impl $name {
            pub fn new() -> Self {
                Self { dialect: $inner {} }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl SqlDialect for $name {
            fn parser_dialect(&self) -> &dyn Dialect {
                &self.dialect
            }

            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

dialect!(DuckDbDialect, SqlParserDuckDb, "duckdb");
dialect!(MsSqlServerDialect, MsSqlDialect, "mssql");
dialect!(PostgresDialect, PostgreSqlDialect, "postgres");
dialect!(AnsiDialect, GenericDialect, "generic");

/// Dialect for a provider engine identifier
///
/// Engines without a dedicated dialect (e.g. catalog snapshots) parse with
/// the generic dialect.
pub fn dialect_for_engine(engine: &str) -> Box<dyn SqlDialect> {
    match engine.to_ascii_lowercase().as_str() {
        "duckdb" => Box::new(DuckDbDialect::new()),
        "mssql" | "sqlserver" | "tsql" => Box::new(MsSqlServerDialect::new()),
        "postgres" | "postgresql" => Box::new(PostgresDialect::new()),
        _ => Box::new(AnsiDialect::new()),
    }
}

/// Dialect by exact name, failing on unknown names
pub fn dialect_by_name(name: &str) -> SqlResult<Box<dyn SqlDialect>> {
    match name.to_ascii_lowercase().as_str() {
        "duckdb" | "mssql" | "sqlserver" | "tsql" | "postgres" | "postgresql" | "generic" => {
            Ok(dialect_for_engine(name))
        }
        _ => Err(SqlError::UnknownDialect(name.to_string())),
    }
}
