//! reflect-mysql Library
//!
//! Read-only reflection of tables, columns and foreign-key relations from
//! the MySQL `information_schema` catalog.

pub mod config;
pub mod database;
pub mod error;
pub mod reflection;

pub use error::{ReflectError, Result};
pub use reflection::{Column, Database, RelationTarget, Table};
