//! atlas-sql - SQL text layer for dbatlas
//!
//! This crate extracts object references from view, routine, trigger and
//! job-step text, parses multi-part object names, and selects a parser
//! dialect per engine.

pub mod dialect;
pub mod error;
pub mod extractor;
pub mod names;

pub use dialect::{dialect_for_engine, SqlDialect};
pub use error::{SqlError, SqlResult};
pub use extractor::{extract_references, view_references, ObjectReference, ReferenceKind};
pub use names::MultipartName;
