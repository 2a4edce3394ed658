//! Foreign-key relations between columns

use crate::database::catalog::{field, CatalogRow, RELATION_COLUMN_FIELD, RELATION_TABLE_FIELD};
use crate::reflection::column::Column;
use crate::reflection::table::Table;
use indexmap::IndexMap;
use std::fmt;

/// Unresolved end of a relation, as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationRef {
    /// Related table name
    pub table: String,
    /// Related column name
    pub column: String,
}

impl RelationRef {
    /// Create a relation end
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Key used in relation maps: `<table>.<column>`
    pub fn key(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }

    /// Read a relation row; rows missing either field are skipped
    pub fn from_row(row: &CatalogRow) -> Option<Self> {
        Some(Self::new(
            field(row, RELATION_TABLE_FIELD)?,
            field(row, RELATION_COLUMN_FIELD)?,
        ))
    }
}

impl fmt::Display for RelationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Merge relation rows from several queries.
///
/// Entries are keyed by `<table>.<column>`; a later duplicate overwrites the
/// earlier one, so each related column appears once.
pub fn merge_relations<'r, I>(rows: I) -> Vec<RelationRef>
where
    I: IntoIterator<Item = &'r CatalogRow>,
{
    let mut merged: IndexMap<String, RelationRef> = IndexMap::new();
    for relation in rows.into_iter().filter_map(RelationRef::from_row) {
        merged.insert(relation.key(), relation);
    }
    merged.into_values().collect()
}

/// What a column may be related with
#[derive(Debug, Clone, Copy)]
pub enum RelationTarget<'a> {
    /// Any column of this table
    Table(&'a Table),
    /// Exactly this column
    Column(&'a Column),
    /// Any column of the table with this name
    TableName(&'a str),
    /// The column `(table, column)` given by name
    TableColumn(&'a str, &'a str),
}

impl<'a> RelationTarget<'a> {
    /// Whether a resolved related column satisfies this target
    pub fn matches(&self, related: &Column) -> bool {
        match *self {
            RelationTarget::Table(table) => related.table_name() == table.name(),
            RelationTarget::Column(column) => {
                related.table_name() == column.table_name() && related.name() == column.name()
            }
            RelationTarget::TableName(table) => related.table_name() == table,
            RelationTarget::TableColumn(table, column) => {
                related.table_name() == table && related.name() == column
            }
        }
    }
}

impl<'a> From<&'a Table> for RelationTarget<'a> {
    fn from(table: &'a Table) -> Self {
        RelationTarget::Table(table)
    }
}

impl<'a> From<&'a Column> for RelationTarget<'a> {
    fn from(column: &'a Column) -> Self {
        RelationTarget::Column(column)
    }
}

impl<'a> From<&'a str> for RelationTarget<'a> {
    fn from(table: &'a str) -> Self {
        RelationTarget::TableName(table)
    }
}

impl<'a> From<(&'a str, &'a str)> for RelationTarget<'a> {
    fn from((table, column): (&'a str, &'a str)) -> Self {
        RelationTarget::TableColumn(table, column)
    }
}
