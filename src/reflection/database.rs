//! Database handle
//!
//! [`Database`] is the entry point of the reflection graph. It holds the
//! schema name and a shared catalog, and builds a fresh [`Table`] on every
//! lookup; nothing below it is cached across calls.

use crate::config::ConnectionConfig;
use crate::database::catalog::{field, Catalog, CatalogQuery, QueryKind, TABLE_NAME_FIELD};
use crate::database::connection::MySqlCatalog;
use crate::error::{Result, ReflectError};
use crate::reflection::table::Table;
use std::fmt;
use std::sync::Arc;

/// A connected database, reflected through its catalog
#[derive(Clone)]
pub struct Database {
    name: Arc<str>,
    catalog: Arc<dyn Catalog>,
}

impl Database {
    /// Connect to MySQL and reflect the configured database
    ///
    /// # Example
    /// ```no_run
    /// use reflect_mysql::config::ConnectionConfig;
    /// use reflect_mysql::reflection::Database;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = ConnectionConfig::new("localhost", "root", None, "shop");
    ///     let database = Database::connect(&config).await?;
    ///     for table in database.tables().await? {
    ///         println!("{}", table);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let catalog = MySqlCatalog::connect(config).await?;
        Ok(Self::with_catalog(config.database.as_str(), Arc::new(catalog)))
    }

    /// Connect from a `mysql://` URL; the URL must select a database
    pub async fn connect_url(url: &str) -> Result<Self> {
        let catalog = MySqlCatalog::connect_url(url).await?;
        let name = catalog.current_database().await?.ok_or_else(|| {
            ReflectError::Config("connection URL does not select a database".to_string())
        })?;
        Ok(Self::with_catalog(name, Arc::new(catalog)))
    }

    /// Reflect schema `name` through any catalog
    pub fn with_catalog(name: impl Into<String>, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            name: Arc::from(name.into()),
            catalog,
        }
    }

    /// Get database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared catalog
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Table names in catalog order
    pub async fn table_names(&self) -> Result<Vec<String>> {
        let rows = self
            .catalog
            .fetch(CatalogQuery::ListTables { schema: &self.name })
            .await?;
        rows.iter()
            .map(|row| {
                field(row, TABLE_NAME_FIELD).map(str::to_string).ok_or_else(|| {
                    ReflectError::query(
                        QueryKind::ListTables.to_string(),
                        format!("row without {}", TABLE_NAME_FIELD),
                    )
                })
            })
            .collect()
    }

    /// Every table, freshly loaded
    pub async fn tables(&self) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        for name in self.table_names().await? {
            tables.push(self.make_table(&name).await?);
        }
        Ok(tables)
    }

    /// Check if a table exists
    pub async fn has_table(&self, name: &str) -> Result<bool> {
        let rows = self
            .catalog
            .fetch(CatalogQuery::TableExists {
                schema: &self.name,
                table: name,
            })
            .await?;
        Ok(!rows.is_empty())
    }

    /// A freshly loaded table, or `None` if it does not exist
    pub async fn table(&self, name: &str) -> Result<Option<Table>> {
        if !self.has_table(name).await? {
            return Ok(None);
        }
        self.make_table(name).await.map(Some)
    }

    async fn make_table(&self, name: &str) -> Result<Table> {
        Table::load(self.clone(), name).await
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").field("name", &self.name).finish()
    }
}
