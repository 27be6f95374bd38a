//! Multi-part object names (`[server].[database].[schema].[object]`)

use crate::error::{SqlError, SqlResult};
use atlas_core::sql_utils::split_name_parts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An object name with one to four parts, unquoted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultipartName {
    parts: Vec<String>,
}

impl MultipartName {
    /// Parse `a`, `a.b`, `a.b.c` or `a.b.c.d`, honouring `[]`, `""` and backtick quoting.
    ///
    /// `db..object` (default schema) keeps an empty schema part.
    pub fn parse(raw: &str) -> SqlResult<Self> {
        let parts = split_name_parts(raw.trim());
        if parts.is_empty() || parts.len() > 4 || parts.last().is_some_and(|p| p.is_empty()) {
            return Err(SqlError::InvalidName(raw.to_string()));
        }
        Ok(Self { parts })
    }

    pub fn from_parts<S: Into<String>>(parts: impl IntoIterator<Item = S>) -> SqlResult<Self> {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(SqlError::InvalidName(parts.join(".")));
        }
        Ok(Self { parts })
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The object (last) part
    pub fn object(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Schema part, if written and non-empty
    pub fn schema(&self) -> Option<&str> {
        self.part_from_end(1)
    }

    /// Database part of a three- or four-part name
    pub fn database(&self) -> Option<&str> {
        self.part_from_end(2)
    }

    /// Linked-server part of a four-part name
    pub fn server(&self) -> Option<&str> {
        self.part_from_end(3)
    }

    fn part_from_end(&self, offset: usize) -> Option<&str> {
        let idx = self.parts.len().checked_sub(offset + 1)?;
        self.parts
            .get(idx)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }
}

impl fmt::Display for MultipartName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bracketed_four_part() {
        let name = MultipartName::parse("[linked].[Shared].[dbo].[Customer Names]").unwrap();
        assert_eq!(name.len(), 4);
        assert_eq!(name.server(), Some("linked"));
        assert_eq!(name.database(), Some("Shared"));
        assert_eq!(name.schema(), Some("dbo"));
        assert_eq!(name.object(), "Customer Names");
    }

    #[test]
    fn test_parse_default_schema() {
        let name = MultipartName::parse("Sales..Orders").unwrap();
        assert_eq!(name.database(), Some("Sales"));
        assert_eq!(name.schema(), None);
        assert_eq!(name.object(), "Orders");
    }

    #[test]
    fn test_parse_single_part() {
        let name = MultipartName::parse("\"Orders\"").unwrap();
        assert_eq!(name.object(), "Orders");
        assert_eq!(name.schema(), None);
        assert_eq!(name.to_string(), "Orders");
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        assert!(MultipartName::parse("").is_err());
        assert!(MultipartName::parse("a.b.c.d.e").is_err());
        assert!(MultipartName::parse("dbo.").is_err());
    }
}
