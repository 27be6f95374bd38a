//! CLI command implementations

pub(crate) mod analyze;
pub(crate) mod common;
pub(crate) mod databases;
pub(crate) mod impact;
