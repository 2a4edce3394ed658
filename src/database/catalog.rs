//! Catalog boundary
//!
//! Every piece of metadata is read through the [`Catalog`] trait. A query is
//! described by a [`CatalogQuery`] value; implementations decide how to run
//! it (parameterized SQL for MySQL, plain lookups for the in-memory catalog).

use crate::error::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::fmt;

/// One result record: field name to textual value (`None` for SQL NULL)
pub type CatalogRow = IndexMap<String, Option<String>>;

/// Field carrying the table name in `ListTables` rows
pub const TABLE_NAME_FIELD: &str = "table_name";

/// Field carrying the column name in `ColumnNames` rows
pub const COLUMN_NAME_FIELD: &str = "COLUMN_NAME";

/// Field carrying the related table in relation rows
pub const RELATION_TABLE_FIELD: &str = "tablename";

/// Field carrying the related column in relation rows
pub const RELATION_COLUMN_FIELD: &str = "colname";

/// The catalog queries the reflection layer issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogQuery<'a> {
    /// All table names in a schema
    ListTables { schema: &'a str },
    /// Rows matching one table name (exact, wildcards are not honored)
    TableExists { schema: &'a str, table: &'a str },
    /// Column names of a table ordered by ordinal position
    ColumnNames { schema: &'a str, table: &'a str },
    /// Column metadata joined with key-usage metadata
    ColumnAttributes {
        schema: &'a str,
        table: &'a str,
        column: &'a str,
    },
    /// Columns this column references
    OutgoingRelations {
        schema: &'a str,
        table: &'a str,
        column: &'a str,
    },
    /// Columns referencing this column
    IncomingRelations {
        schema: &'a str,
        table: &'a str,
        column: &'a str,
    },
}

/// Discriminant of a [`CatalogQuery`], used for counting and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryKind {
    ListTables,
    TableExists,
    ColumnNames,
    ColumnAttributes,
    OutgoingRelations,
    IncomingRelations,
}

impl CatalogQuery<'_> {
    /// Kind of this query
    pub fn kind(&self) -> QueryKind {
        match self {
            CatalogQuery::ListTables { .. } => QueryKind::ListTables,
            CatalogQuery::TableExists { .. } => QueryKind::TableExists,
            CatalogQuery::ColumnNames { .. } => QueryKind::ColumnNames,
            CatalogQuery::ColumnAttributes { .. } => QueryKind::ColumnAttributes,
            CatalogQuery::OutgoingRelations { .. } => QueryKind::OutgoingRelations,
            CatalogQuery::IncomingRelations { .. } => QueryKind::IncomingRelations,
        }
    }

    /// Schema the query is scoped to
    pub fn schema(&self) -> &str {
        match *self {
            CatalogQuery::ListTables { schema }
            | CatalogQuery::TableExists { schema, .. }
            | CatalogQuery::ColumnNames { schema, .. }
            | CatalogQuery::ColumnAttributes { schema, .. }
            | CatalogQuery::OutgoingRelations { schema, .. }
            | CatalogQuery::IncomingRelations { schema, .. } => schema,
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryKind::ListTables => "list tables",
            QueryKind::TableExists => "table exists",
            QueryKind::ColumnNames => "column names",
            QueryKind::ColumnAttributes => "column attributes",
            QueryKind::OutgoingRelations => "outgoing relations",
            QueryKind::IncomingRelations => "incoming relations",
        };
        write!(f, "{}", name)
    }
}

/// Queryable metadata source
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Run one catalog query and return all of its rows
    async fn fetch(&self, query: CatalogQuery<'_>) -> Result<Vec<CatalogRow>>;
}

/// Read a text field from a row, treating NULL and absence alike
pub fn field<'r>(row: &'r CatalogRow, name: &str) -> Option<&'r str> {
    row.get(name).and_then(|value| value.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_kind_and_schema() {
        let query = CatalogQuery::IncomingRelations {
            schema: "shop",
            table: "customers",
            column: "id",
        };
        assert_eq!(query.kind(), QueryKind::IncomingRelations);
        assert_eq!(query.schema(), "shop");
        assert_eq!(query.kind().to_string(), "incoming relations");
    }

    #[test]
    fn test_field_null_is_none() {
        let mut row = CatalogRow::new();
        row.insert("a".to_string(), Some("x".to_string()));
        row.insert("b".to_string(), None);

        assert_eq!(field(&row, "a"), Some("x"));
        assert_eq!(field(&row, "b"), None);
        assert_eq!(field(&row, "c"), None);
    }
}
