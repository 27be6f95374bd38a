//! Coarse data-type families for cross-engine compatibility checks

/// Broad family of a declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Integer,
    Decimal,
    Float,
    String,
    Uuid,
    Date,
    Time,
    Timestamp,
    Boolean,
    Binary,
    /// Anything unrecognized; compatible with every family
    Other,
}

impl TypeFamily {
    /// Classify an engine type name (`"INTEGER"`, `"nvarchar(50)"`, `"numeric(10,2)"`...)
    pub fn of(data_type: &str) -> Self {
        let lower = data_type.trim().to_ascii_lowercase();
        let base = lower
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        match base {
            "int" | "integer" | "int2" | "int4" | "int8" | "bigint" | "smallint" | "tinyint"
            | "hugeint" | "ubigint" | "uinteger" | "usmallint" | "utinyint" | "serial"
            | "bigserial" | "smallserial" | "long" | "short" => TypeFamily::Integer,
            "decimal" | "numeric" | "money" | "smallmoney" | "number" => TypeFamily::Decimal,
            "float" | "float4" | "float8" | "real" | "double" => TypeFamily::Float,
            "char" | "nchar" | "varchar" | "nvarchar" | "text" | "ntext" | "string" | "bpchar"
            | "character" | "citext" | "sysname" => TypeFamily::String,
            "uuid" | "uniqueidentifier" => TypeFamily::Uuid,
            "date" => TypeFamily::Date,
            "time" | "timetz" => TypeFamily::Time,
            "timestamp" | "timestamptz" | "datetime" | "datetime2" | "smalldatetime"
            | "datetimeoffset" => TypeFamily::Timestamp,
            "bool" | "boolean" | "bit" => TypeFamily::Boolean,
            "binary" | "varbinary" | "blob" | "bytea" | "image" => TypeFamily::Binary,
            _ => TypeFamily::Other,
        }
    }
}

/// Whether values of `a` can meaningfully join to values of `b`.
///
/// Integers and exact decimals are interchangeable; strings may hold
/// UUIDs; an unrecognized type never suppresses a match.
pub fn types_compatible(a: &str, b: &str) -> bool {
    use TypeFamily::*;
    match (TypeFamily::of(a), TypeFamily::of(b)) {
        (Other, _) | (_, Other) => true,
        (Integer | Decimal, Integer | Decimal) => true,
        (String | Uuid, String | Uuid) => true,
        (Date | Timestamp, Date | Timestamp) => true,
        (x, y) => x == y,
    }
}
