//! Table reflection

use crate::database::catalog::{field, CatalogQuery, QueryKind, COLUMN_NAME_FIELD};
use crate::error::{Result, ReflectError};
use crate::reflection::column::Column;
use crate::reflection::database::Database;
use indexmap::IndexMap;
use std::fmt;

/// A reflected table with all of its columns loaded
#[derive(Clone)]
pub struct Table {
    database: Database,
    name: String,
    /// Columns in ordinal order
    columns: IndexMap<String, Column>,
    /// Name of the primary column, if any
    primary: Option<String>,
}

impl Table {
    /// Load a table and every one of its columns
    pub async fn load(database: Database, name: &str) -> Result<Self> {
        let rows = database
            .catalog()
            .fetch(CatalogQuery::ColumnNames {
                schema: database.name(),
                table: name,
            })
            .await?;

        let mut columns = IndexMap::with_capacity(rows.len());
        let mut primary = None;

        for row in &rows {
            let column_name = field(row, COLUMN_NAME_FIELD).ok_or_else(|| {
                ReflectError::query(
                    QueryKind::ColumnNames.to_string(),
                    format!("row without {} for table {}", COLUMN_NAME_FIELD, name),
                )
            })?;
            let column = Column::load(database.clone(), name, column_name).await?;
            // Single-column policy: the last PRI column in ordinal order wins.
            if column.is_primary() {
                primary = Some(column_name.to_string());
            }
            columns.insert(column_name.to_string(), column);
        }

        tracing::debug!(table = name, columns = columns.len(), "loaded table");

        Ok(Self {
            database,
            name: name.to_string(),
            columns,
            primary,
        })
    }

    /// Get table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the owning database handle
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Columns in ordinal order
    pub fn columns(&self) -> &IndexMap<String, Column> {
        &self.columns
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Check if the table has a column
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// The primary-key column. With a composite key this is the last key
    /// column; use [`Table::primary_keys`] for all of them.
    pub fn primary(&self) -> Option<&Column> {
        self.primary.as_deref().and_then(|name| self.column(name))
    }

    /// Every primary-key column in ordinal order
    pub fn primary_keys(&self) -> Vec<&Column> {
        self.columns.values().filter(|c| c.is_primary()).collect()
    }

    /// Indexed columns (primary, unique or MUL) in ordinal order
    pub fn indexes(&self) -> IndexMap<&str, &Column> {
        self.columns
            .iter()
            .filter(|(_, column)| column.is_indexed())
            .map(|(name, column)| (name.as_str(), column))
            .collect()
    }

    /// Relations of every column, keyed `<table>.<column>:<refTable>.<refColumn>`
    pub async fn relations(&self) -> Result<IndexMap<String, (Column, Column)>> {
        let mut relations = IndexMap::new();
        for (name, column) in &self.columns {
            let column_key = format!("{}.{}", self.name, name);
            for (related_key, related) in column.relations().await? {
                relations.insert(
                    format!("{}:{}", column_key, related_key),
                    (column.clone(), related),
                );
            }
        }
        Ok(relations)
    }

    /// Format table schema for display
    pub fn format_schema(&self) -> String {
        let mut result = format!("Table: {}\n", self.name);

        let keys: Vec<&str> = self.primary_keys().iter().map(|c| c.name()).collect();
        if !keys.is_empty() {
            result.push_str(&format!("  Primary Key: {}\n", keys.join(", ")));
        }

        result.push_str("  Columns:\n");
        for column in self.columns.values() {
            result.push_str(&format!("    {}\n", column));
        }

        result
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("database", &self.database.name())
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("primary", &self.primary)
            .finish()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::catalog::{Catalog, CatalogRow};
    use crate::database::memory::{MemoryCatalog, MemoryColumn, MemoryTable};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Serves `inner`, but with gaps: no attribute row for `column`, or a
    /// NULL name in the column listing
    struct GappedCatalog {
        inner: Arc<MemoryCatalog>,
        column: &'static str,
        null_name: bool,
    }

    #[async_trait]
    impl Catalog for GappedCatalog {
        async fn fetch(&self, query: CatalogQuery<'_>) -> Result<Vec<CatalogRow>> {
            let mut rows = self.inner.fetch(query).await?;
            match query {
                CatalogQuery::ColumnAttributes { column, .. } if column == self.column => {
                    rows.clear();
                }
                CatalogQuery::ColumnNames { .. } if self.null_name => {
                    let mut row = CatalogRow::new();
                    row.insert(COLUMN_NAME_FIELD.to_string(), None);
                    rows.push(row);
                }
                _ => {}
            }
            Ok(rows)
        }
    }

    fn catalog() -> Arc<MemoryCatalog> {
        Arc::new(
            MemoryCatalog::new("shop").with_table(
                MemoryTable::new("order_items")
                    .with_column(MemoryColumn::new("order_id", "int").key("PRI").nullable(false))
                    .with_column(MemoryColumn::new("line", "int").key("PRI").nullable(false))
                    .with_column(MemoryColumn::new("sku", "varchar").key("MUL"))
                    .with_column(MemoryColumn::new("note", "text")),
            ),
        )
    }

    #[tokio::test]
    async fn test_load_keeps_ordinal_order() {
        let catalog = catalog();
        let database = Database::with_catalog("shop", catalog.clone());
        let table = Table::load(database, "order_items").await.unwrap();

        let names: Vec<_> = table.columns().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["order_id", "line", "sku", "note"]);
        let positions: Vec<_> = table.columns().values().map(Column::sort_order).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);

        assert_eq!(catalog.query_count(QueryKind::ColumnNames), 1);
        assert_eq!(catalog.query_count(QueryKind::ColumnAttributes), 4);
    }

    #[tokio::test]
    async fn test_composite_primary_last_wins() {
        let database = Database::with_catalog("shop", catalog());
        let table = Table::load(database, "order_items").await.unwrap();

        assert_eq!(table.primary().map(Column::name), Some("line"));
        let keys: Vec<_> = table.primary_keys().into_iter().map(Column::name).collect();
        assert_eq!(keys, vec!["order_id", "line"]);
    }

    #[tokio::test]
    async fn test_indexes_and_lookup() {
        let database = Database::with_catalog("shop", catalog());
        let table = Table::load(database, "order_items").await.unwrap();

        let indexes: Vec<_> = table.indexes().keys().copied().collect();
        assert_eq!(indexes, vec!["order_id", "line", "sku"]);
        assert!(table.has_column("note"));
        assert!(table.column("missing").is_none());
        assert!(table.relations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_format_schema() {
        let database = Database::with_catalog("shop", catalog());
        let table = Table::load(database, "order_items").await.unwrap();

        let formatted = table.to_string();
        assert!(formatted.starts_with("Table: order_items\n"));
        assert!(formatted.contains("Primary Key: order_id, line"));
        assert!(formatted.contains("sku: varchar INDEX"));
    }

    #[tokio::test]
    async fn test_query_error_propagates() {
        let catalog = catalog();
        catalog.fail_on(QueryKind::ColumnAttributes);
        let database = Database::with_catalog("shop", catalog);

        let err = Table::load(database, "order_items").await.unwrap_err();
        assert!(matches!(err, crate::error::ReflectError::Query { .. }));
    }

    #[tokio::test]
    async fn test_missing_attribute_row_fails_load() {
        let gapped = GappedCatalog {
            inner: catalog(),
            column: "sku",
            null_name: false,
        };
        let database = Database::with_catalog("shop", Arc::new(gapped));

        let err = Table::load(database, "order_items").await.unwrap_err();
        match err {
            ReflectError::Query { query, message } => {
                assert_eq!(query, "column attributes");
                assert!(message.contains("order_items.sku"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_null_column_name_fails_load() {
        let gapped = GappedCatalog {
            inner: catalog(),
            column: "",
            null_name: true,
        };
        let database = Database::with_catalog("shop", Arc::new(gapped));

        let err = Table::load(database, "order_items").await.unwrap_err();
        match err {
            ReflectError::Query { query, .. } => assert_eq!(query, "column names"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
