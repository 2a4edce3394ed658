//! In-memory catalog
//!
//! A [`Catalog`] that answers every query from a [`SchemaFixture`] held in
//! memory. It counts the queries it serves per [`QueryKind`] and can be told
//! to fail a given kind, which makes it the test double for the reflection
//! layer. Fixtures can be built in code or loaded from JSON.

use crate::database::catalog::{
    Catalog, CatalogQuery, CatalogRow, QueryKind, COLUMN_NAME_FIELD, RELATION_COLUMN_FIELD,
    RELATION_TABLE_FIELD, TABLE_NAME_FIELD,
};
use crate::error::{Result, ReflectError};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, RwLock};

/// One column of a fixture table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryColumn {
    /// Column name
    pub name: String,
    /// Raw catalog attributes (DATA_TYPE, COLUMN_KEY, EXTRA, ...)
    #[serde(default)]
    pub attributes: IndexMap<String, Option<String>>,
}

impl MemoryColumn {
    /// Create a nullable column of the given data type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let mut column = Self {
            name: name.into(),
            attributes: IndexMap::new(),
        };
        column.set("DATA_TYPE", Some(data_type.into()));
        column.set("IS_NULLABLE", Some("YES".to_string()));
        column.set("COLUMN_KEY", Some(String::new()));
        column.set("EXTRA", Some(String::new()));
        column.set("COLUMN_DEFAULT", None);
        column.set("COLUMN_COMMENT", Some(String::new()));
        column
    }

    /// Set a raw attribute
    pub fn attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, Some(value.into()));
        self
    }

    /// Set COLUMN_KEY (PRI, UNI, MUL)
    pub fn key(self, key: &str) -> Self {
        self.attribute("COLUMN_KEY", key)
    }

    /// Set EXTRA
    pub fn extra(self, extra: &str) -> Self {
        self.attribute("EXTRA", extra)
    }

    /// Set IS_NULLABLE
    pub fn nullable(self, nullable: bool) -> Self {
        self.attribute("IS_NULLABLE", if nullable { "YES" } else { "NO" })
    }

    /// Set COLUMN_DEFAULT
    pub fn default_value(self, value: &str) -> Self {
        self.attribute("COLUMN_DEFAULT", value)
    }

    /// Set COLUMN_COMMENT
    pub fn comment(self, comment: &str) -> Self {
        self.attribute("COLUMN_COMMENT", comment)
    }

    /// Set CHARACTER_MAXIMUM_LENGTH together with charset and collation
    pub fn text(self, length: u64, charset: &str, collation: &str) -> Self {
        self.attribute("CHARACTER_MAXIMUM_LENGTH", length.to_string())
            .attribute("CHARACTER_SET_NAME", charset)
            .attribute("COLLATION_NAME", collation)
    }

    fn set(&mut self, key: &str, value: Option<String>) {
        self.attributes.insert(key.to_uppercase(), value);
    }
}

/// One fixture table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryTable {
    /// Table name
    pub name: String,
    /// Columns in ordinal order
    #[serde(default)]
    pub columns: Vec<MemoryColumn>,
}

impl MemoryTable {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Append a column; its ordinal position follows the previous one
    pub fn with_column(mut self, column: MemoryColumn) -> Self {
        self.columns.push(column);
        self
    }
}

/// A foreign key from `table.column` to `referenced_table.referenced_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// Constraint name; derived from the columns when absent
    #[serde(default)]
    pub constraint: Option<String>,
}

impl ForeignKey {
    fn constraint_name(&self) -> String {
        self.constraint
            .clone()
            .unwrap_or_else(|| format!("fk_{}_{}", self.table, self.column))
    }
}

/// Complete description of one schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaFixture {
    /// Schema (database) name
    pub schema: String,
    #[serde(default)]
    pub tables: Vec<MemoryTable>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

/// Catalog answering queries from an in-memory fixture
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    fixture: RwLock<SchemaFixture>,
    counts: Mutex<BTreeMap<QueryKind, usize>>,
    failing: Mutex<BTreeSet<QueryKind>>,
}

impl MemoryCatalog {
    /// Create an empty catalog for `schema`
    pub fn new(schema: impl Into<String>) -> Self {
        Self::from_fixture(SchemaFixture {
            schema: schema.into(),
            ..SchemaFixture::default()
        })
    }

    /// Create a catalog from a fixture
    pub fn from_fixture(fixture: SchemaFixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            ..Self::default()
        }
    }

    /// Parse a JSON fixture
    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: SchemaFixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(fixture))
    }

    /// Add a table
    pub fn with_table(self, table: MemoryTable) -> Self {
        self.write_fixture().tables.push(table);
        self
    }

    /// Add a foreign key `table.column -> referenced_table.referenced_column`
    pub fn with_foreign_key(
        self,
        table: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
    ) -> Self {
        self.write_fixture().foreign_keys.push(ForeignKey {
            table: table.to_string(),
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            constraint: None,
        });
        self
    }

    /// Schema name served by this catalog
    pub fn schema(&self) -> String {
        self.read_fixture().schema.clone()
    }

    /// Remove a table, leaving foreign keys that mention it in place
    pub fn drop_table(&self, name: &str) -> bool {
        let mut fixture = self.write_fixture();
        let before = fixture.tables.len();
        fixture.tables.retain(|table| table.name != name);
        fixture.tables.len() != before
    }

    /// Make every later query of `kind` fail
    pub fn fail_on(&self, kind: QueryKind) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind);
    }

    /// Number of queries of `kind` served so far
    pub fn query_count(&self, kind: QueryKind) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    /// Number of queries of any kind served so far
    pub fn total_queries(&self) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .sum()
    }

    /// Reset all query counters
    pub fn reset_counts(&self) {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn read_fixture(&self) -> std::sync::RwLockReadGuard<'_, SchemaFixture> {
        self.fixture.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_fixture(&self) -> std::sync::RwLockWriteGuard<'_, SchemaFixture> {
        self.fixture.write().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, kind: QueryKind) -> Result<()> {
        *self
            .counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_insert(0) += 1;

        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&kind) {
            return Err(ReflectError::query(kind.to_string(), "injected failure"));
        }
        Ok(())
    }

    fn answer(&self, query: &CatalogQuery<'_>) -> Vec<CatalogRow> {
        let fixture = self.read_fixture();
        if fixture.schema != query.schema() {
            return Vec::new();
        }

        match *query {
            CatalogQuery::ListTables { .. } => fixture
                .tables
                .iter()
                .map(|table| row(&[(TABLE_NAME_FIELD, Some(&table.name))]))
                .collect(),
            CatalogQuery::TableExists { table, .. } => fixture
                .tables
                .iter()
                .filter(|t| t.name == table)
                .map(|t| row(&[(TABLE_NAME_FIELD, Some(&t.name))]))
                .collect(),
            CatalogQuery::ColumnNames { table, .. } => find_table(&fixture, table)
                .map(|t| {
                    t.columns
                        .iter()
                        .map(|c| row(&[(COLUMN_NAME_FIELD, Some(&c.name))]))
                        .collect()
                })
                .unwrap_or_default(),
            CatalogQuery::ColumnAttributes { table, column, .. } => {
                column_attributes(&fixture, table, column)
                    .into_iter()
                    .collect()
            }
            CatalogQuery::OutgoingRelations { table, column, .. } => fixture
                .foreign_keys
                .iter()
                .filter(|fk| fk.table == table && fk.column == column)
                .map(|fk| relation_row(&fk.referenced_table, &fk.referenced_column))
                .collect(),
            CatalogQuery::IncomingRelations { table, column, .. } => fixture
                .foreign_keys
                .iter()
                .filter(|fk| fk.referenced_table == table && fk.referenced_column == column)
                .map(|fk| relation_row(&fk.table, &fk.column))
                .collect(),
        }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn fetch(&self, query: CatalogQuery<'_>) -> Result<Vec<CatalogRow>> {
        self.record(query.kind())?;
        Ok(self.answer(&query))
    }
}

fn find_table<'f>(fixture: &'f SchemaFixture, name: &str) -> Option<&'f MemoryTable> {
    fixture.tables.iter().find(|t| t.name == name)
}

fn row(fields: &[(&str, Option<&String>)]) -> CatalogRow {
    fields
        .iter()
        .map(|(key, value)| (key.to_string(), value.cloned()))
        .collect()
}

fn relation_row(table: &str, column: &str) -> CatalogRow {
    let mut record = CatalogRow::new();
    record.insert(RELATION_COLUMN_FIELD.to_string(), Some(column.to_string()));
    record.insert(RELATION_TABLE_FIELD.to_string(), Some(table.to_string()));
    record
}

/// Build the joined column + key-usage row the MySQL catalog would return
fn column_attributes(fixture: &SchemaFixture, table: &str, column: &str) -> Option<CatalogRow> {
    let memory_table = find_table(fixture, table)?;
    let (position, memory_column) = memory_table
        .columns
        .iter()
        .enumerate()
        .find(|(_, c)| c.name == column)?;

    let mut record = CatalogRow::new();
    record.insert("TABLE_CATALOG".to_string(), Some("def".to_string()));
    record.insert("TABLE_SCHEMA".to_string(), Some(fixture.schema.clone()));
    record.insert("TABLE_NAME".to_string(), Some(table.to_string()));
    record.insert("COLUMN_NAME".to_string(), Some(column.to_string()));
    record.insert(
        "ORDINAL_POSITION".to_string(),
        Some((position + 1).to_string()),
    );
    for (key, value) in &memory_column.attributes {
        record.insert(key.to_uppercase(), value.clone());
    }

    let key_usage = fixture
        .foreign_keys
        .iter()
        .find(|fk| fk.table == table && fk.column == column);
    record.insert(
        "CONSTRAINT_NAME".to_string(),
        key_usage.map(ForeignKey::constraint_name),
    );
    record.insert(
        "REFERENCED_TABLE_SCHEMA".to_string(),
        key_usage.map(|_| fixture.schema.clone()),
    );
    record.insert(
        "REFERENCED_TABLE_NAME".to_string(),
        key_usage.map(|fk| fk.referenced_table.clone()),
    );
    record.insert(
        "REFERENCED_COLUMN_NAME".to_string(),
        key_usage.map(|fk| fk.referenced_column.clone()),
    );

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::catalog::field;

    fn shop() -> MemoryCatalog {
        MemoryCatalog::new("shop")
            .with_table(
                MemoryTable::new("customers")
                    .with_column(MemoryColumn::new("id", "int").key("PRI"))
                    .with_column(MemoryColumn::new("email", "varchar").key("UNI")),
            )
            .with_table(
                MemoryTable::new("orders")
                    .with_column(MemoryColumn::new("id", "int").key("PRI"))
                    .with_column(MemoryColumn::new("customer_id", "int").key("MUL")),
            )
            .with_foreign_key("orders", "customer_id", "customers", "id")
    }

    #[test]
    fn test_list_and_exists() {
        let catalog = shop();
        let rows = tokio_test::block_on(catalog.fetch(CatalogQuery::ListTables { schema: "shop" }))
            .unwrap();
        let names: Vec<_> = rows.iter().filter_map(|r| field(r, TABLE_NAME_FIELD)).collect();
        assert_eq!(names, vec!["customers", "orders"]);

        let rows = tokio_test::block_on(catalog.fetch(CatalogQuery::TableExists {
            schema: "shop",
            table: "order%",
        }))
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_other_schema_is_empty() {
        let catalog = shop();
        let rows = tokio_test::block_on(catalog.fetch(CatalogQuery::ListTables { schema: "crm" }))
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(catalog.query_count(QueryKind::ListTables), 1);
    }

    #[test]
    fn test_column_attributes_join_key_usage() {
        let catalog = shop();
        let rows = tokio_test::block_on(catalog.fetch(CatalogQuery::ColumnAttributes {
            schema: "shop",
            table: "orders",
            column: "customer_id",
        }))
        .unwrap();

        assert_eq!(rows.len(), 1);
        let record = &rows[0];
        assert_eq!(field(record, "ORDINAL_POSITION"), Some("2"));
        assert_eq!(field(record, "COLUMN_KEY"), Some("MUL"));
        assert_eq!(field(record, "REFERENCED_TABLE_NAME"), Some("customers"));
        assert_eq!(
            field(record, "CONSTRAINT_NAME"),
            Some("fk_orders_customer_id")
        );
    }

    #[test]
    fn test_relation_directions() {
        let catalog = shop();
        let outgoing = tokio_test::block_on(catalog.fetch(CatalogQuery::OutgoingRelations {
            schema: "shop",
            table: "orders",
            column: "customer_id",
        }))
        .unwrap();
        assert_eq!(field(&outgoing[0], RELATION_TABLE_FIELD), Some("customers"));
        assert_eq!(field(&outgoing[0], RELATION_COLUMN_FIELD), Some("id"));

        let incoming = tokio_test::block_on(catalog.fetch(CatalogQuery::IncomingRelations {
            schema: "shop",
            table: "customers",
            column: "id",
        }))
        .unwrap();
        assert_eq!(field(&incoming[0], RELATION_TABLE_FIELD), Some("orders"));
        assert_eq!(field(&incoming[0], RELATION_COLUMN_FIELD), Some("customer_id"));
    }

    #[test]
    fn test_fail_on_counts_and_errors() {
        let catalog = shop();
        catalog.fail_on(QueryKind::ColumnNames);
        let err = tokio_test::block_on(catalog.fetch(CatalogQuery::ColumnNames {
            schema: "shop",
            table: "orders",
        }))
        .unwrap_err();

        assert!(matches!(err, ReflectError::Query { .. }));
        assert_eq!(catalog.query_count(QueryKind::ColumnNames), 1);
        assert_eq!(catalog.total_queries(), 1);
        catalog.reset_counts();
        assert_eq!(catalog.total_queries(), 0);
    }

    #[test]
    fn test_from_json() {
        let catalog = MemoryCatalog::from_json(
            r#"{
                "schema": "blog",
                "tables": [
                    {"name": "posts", "columns": [
                        {"name": "id", "attributes": {"DATA_TYPE": "int", "COLUMN_KEY": "PRI"}}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(catalog.schema(), "blog");
        assert!(catalog.drop_table("posts"));
        assert!(!catalog.drop_table("posts"));
    }
}
