//! atlas-db - Catalog provider layer for dbatlas
//!
//! This crate provides the `CatalogProvider` and `ProviderFactory` traits,
//! connection-string parsing, and implementations for DuckDB and JSON
//! catalog snapshots.

pub mod connection;
pub mod duckdb;
pub mod error;
pub mod snapshot;
pub mod traits;

pub use connection::ConnectionTarget;
pub use duckdb::{DuckDbFactory, DuckDbProvider};
pub use error::{DbError, DbResult};
pub use snapshot::{CatalogSnapshot, DatabaseSnapshot, ServerSnapshot, SnapshotFactory};
pub use traits::{CatalogProvider, ProviderFactory, QueryRow};

use atlas_core::ProviderType;
use std::sync::Arc;

/// Default factory for a provider type
pub fn factory_for(provider: ProviderType) -> Arc<dyn ProviderFactory> {
    match provider {
        ProviderType::DuckDb => Arc::new(DuckDbFactory::new()),
        ProviderType::Snapshot => Arc::new(SnapshotFactory::new()),
    }
}
