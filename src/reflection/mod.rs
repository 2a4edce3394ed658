//! Reflection module
//!
//! Navigable descriptors over a schema: [`Database`] lists and builds
//! [`Table`]s, tables own their [`Column`]s, and columns resolve their
//! foreign-key relations back through the database.

pub mod column;
pub mod database;
pub mod relation;
pub mod table;

// Re-exports
pub use column::Column;
pub use database::Database;
pub use relation::{RelationRef, RelationTarget};
pub use table::Table;
