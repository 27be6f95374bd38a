//! Object reference extraction from object definition text
//!
//! Procedural bodies (procedures, triggers, job steps) are scanned with a
//! regex over `FROM` / `JOIN` / `EXEC` targets after comments and string
//! literals are blanked out. View bodies are parsed and walked with
//! `visit_relations`, falling back to the regex scan when they don't parse.

use crate::dialect::SqlDialect;
use crate::names::MultipartName;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{visit_relations, ObjectNamePart, SetExpr, Statement};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::OnceLock;

/// How the referencing object uses the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// Read or written as a relation (`FROM`, `JOIN`)
    Relation,
    /// Invoked (`EXEC`)
    Execute,
}

/// One referenced object name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    pub name: MultipartName,
    pub kind: ReferenceKind,
}

const NAME_PART: &str = r#"(?:\[[^\]]+\]|"[^"]+"|`[^`]+`|[A-Za-z_@#][\w@#$]*)"#;

/// Words that follow FROM/JOIN/EXEC without naming a catalog object
const NON_OBJECT_WORDS: &[&str] = &[
    "select",
    "where",
    "set",
    "values",
    "as",
    "on",
    "lateral",
    "unnest",
    "openquery",
    "openrowset",
    "openjson",
    "openxml",
    "string_split",
    "sp_executesql",
    "dual",
];

fn reference_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let name = format!(r"{part}(?:\s*\.\s*(?:{part})?){{0,3}}", part = NAME_PART);
        regex::Regex::new(&format!(
            r"(?i)\b(from|join|exec(?:ute)?)\s+(?:@\w+\s*=\s*)?({})",
            name
        ))
        .expect("valid regex literal")
    })
}

/// Replace comments and string literals with spaces, keeping offsets.
///
/// Quoted identifiers (`"..."`, `[...]`) are kept as written.
pub fn strip_comments_and_strings(sql: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str,
    }

    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut state = State::Code;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        match state {
            State::Code => match (ch, next) {
                ('-', Some('-')) => {
                    state = State::LineComment;
                    out.push_str("  ");
                    i += 1;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment;
                    out.push_str("  ");
                    i += 1;
                }
                ('\'', _) => {
                    state = State::Str;
                    out.push(' ');
                }
                _ => out.push(ch),
            },
            State::LineComment => {
                if ch == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if ch == '*' && next == Some('/') {
                    state = State::Code;
                    out.push_str("  ");
                    i += 1;
                } else {
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                }
            }
            State::Str => {
                if ch == '\'' && next == Some('\'') {
                    out.push_str("  ");
                    i += 1;
                } else if ch == '\'' {
                    state = State::Code;
                    out.push(' ');
                } else {
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                }
            }
        }
        i += 1;
    }
    out
}

fn is_candidate(name: &MultipartName) -> bool {
    let object = name.object();
    if object.starts_with('@') || object.starts_with('#') {
        return false;
    }
    if name.parts().iter().any(|p| p.starts_with('@')) {
        return false;
    }
    !(name.len() == 1
        && NON_OBJECT_WORDS
            .iter()
            .any(|w| w.eq_ignore_ascii_case(object)))
}

/// Scan procedural text for `FROM` / `JOIN` / `EXEC` targets.
///
/// Variables, temp tables and known non-object keywords are skipped;
/// duplicates keep their first occurrence.
pub fn extract_references(sql: &str) -> Vec<ObjectReference> {
    let cleaned = strip_comments_and_strings(sql);
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for caps in reference_pattern().captures_iter(&cleaned) {
        let (Some(keyword), Some(raw)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Ok(name) = MultipartName::parse(raw.as_str()) else {
            continue;
        };
        if !is_candidate(&name) {
            continue;
        }
        let kind = if keyword.as_str().to_ascii_lowercase().starts_with("exec") {
            ReferenceKind::Execute
        } else {
            ReferenceKind::Relation
        };
        let reference = ObjectReference { name, kind };
        if seen.insert(reference.clone()) {
            refs.push(reference);
        }
    }
    refs
}

/// Relation names referenced by parsed statements, excluding CTE names.
pub fn relations_in(statements: &[Statement]) -> Vec<MultipartName> {
    let mut ctes = HashSet::new();
    for stmt in statements {
        if let Statement::Query(query) = stmt {
            if let Some(with) = &query.with {
                for cte in &with.cte_tables {
                    ctes.insert(cte.alias.name.value.to_ascii_lowercase());
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for stmt in statements {
        let _ = visit_relations(stmt, |relation| {
            let parts: Vec<String> = relation
                .0
                .iter()
                .filter_map(|part| match part {
                    ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
                    _ => None,
                })
                .collect();
            if parts.len() == relation.0.len() {
                let is_cte = parts.len() == 1 && ctes.contains(&parts[0].to_ascii_lowercase());
                if let (false, Ok(name)) = (is_cte, MultipartName::from_parts(parts)) {
                    if seen.insert(name.to_string().to_ascii_lowercase()) {
                        names.push(name);
                    }
                }
            }
            ControlFlow::<()>::Continue(())
        });
    }
    names
}

fn view_header() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(
            r"(?is)^\s*create\s+(?:or\s+\w+\s+)?(?:temp(?:orary)?\s+)?view\s+.*?\bas\b",
        )
        .expect("valid regex literal")
    })
}

/// The query part of a view definition (`CREATE VIEW v AS <query>`)
pub fn view_body(definition: &str) -> &str {
    match view_header().find(definition) {
        Some(m) => &definition[m.end()..],
        None => definition,
    }
}

/// References in a view definition.
///
/// The query body is parsed with `dialect`; text the parser rejects (or
/// that is not a query) is scanned with [`extract_references`].
pub fn view_references(dialect: &dyn SqlDialect, definition: &str) -> Vec<ObjectReference> {
    let body = view_body(definition);
    match dialect.parse(body) {
        Ok(statements) if !statements.is_empty() && statements.iter().all(is_query) => {
            relations_in(&statements)
                .into_iter()
                .map(|name| ObjectReference {
                    name,
                    kind: ReferenceKind::Relation,
                })
                .collect()
        }
        _ => extract_references(body),
    }
}

fn is_query(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(q) => !matches!(q.body.as_ref(), SetExpr::Values(_)),
        _ => false,
    }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
