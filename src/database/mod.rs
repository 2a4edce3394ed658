//! Database module
//!
//! This module provides the catalog boundary and its implementations:
//! parameterized queries over a MySQL pool and an in-memory fixture catalog.

pub mod catalog;
pub mod connection;
pub mod memory;

// Re-exports
pub use catalog::{Catalog, CatalogQuery, CatalogRow, QueryKind};
pub use connection::MySqlCatalog;
pub use memory::{MemoryCatalog, MemoryColumn, MemoryTable, SchemaFixture};
