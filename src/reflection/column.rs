//! Column reflection
//!
//! A [`Column`] carries the raw catalog attributes of one column, loaded
//! when the column is constructed, and resolves its foreign-key relations
//! on first use.

use crate::database::catalog::{CatalogQuery, CatalogRow, QueryKind};
use crate::error::{Result, ReflectError};
use crate::reflection::database::Database;
use crate::reflection::relation::{merge_relations, RelationRef, RelationTarget};
use crate::reflection::table::Table;
use indexmap::IndexMap;
use std::fmt;
use tokio::sync::OnceCell;

/// Literal MySQL reports in EXTRA for auto-increment columns
const AUTO_INCREMENT: &str = "auto_increment";

/// Legacy spelling accepted alongside [`AUTO_INCREMENT`]
const AUTO_INCREMENT_LEGACY: &str = "auto increment";

/// One column of a reflected table
#[derive(Clone)]
pub struct Column {
    database: Database,
    table: String,
    name: String,
    /// Attribute name (upper-cased) to value
    info: CatalogRow,
    relations: OnceCell<Vec<RelationRef>>,
}

impl Column {
    /// Load the attributes of `table.name` from the catalog
    pub async fn load(database: Database, table: &str, name: &str) -> Result<Self> {
        let rows = database
            .catalog()
            .fetch(CatalogQuery::ColumnAttributes {
                schema: database.name(),
                table,
                column: name,
            })
            .await?;

        let info = rows.into_iter().next().ok_or_else(|| {
            ReflectError::query(
                QueryKind::ColumnAttributes.to_string(),
                format!("no catalog row for {}.{}", table, name),
            )
        })?;

        Ok(Self::from_info(database, table, name, info))
    }

    /// Build a column from already fetched attributes
    pub fn from_info(database: Database, table: &str, name: &str, info: CatalogRow) -> Self {
        Self {
            database,
            table: table.to_string(),
            name: name.to_string(),
            info: normalize(info),
            relations: OnceCell::new(),
        }
    }

    /// Get column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning table
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Get the owning database handle
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Reload the owning table through the database
    pub async fn table(&self) -> Result<Option<Table>> {
        self.database.table(&self.table).await
    }

    /// Look up an attribute, case-insensitively
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info_or(key, None)
    }

    /// Look up an attribute; `default` is returned only when the key is absent.
    /// A present NULL stays `None`.
    pub fn info_or<'a>(&'a self, key: &str, default: Option<&'a str>) -> Option<&'a str> {
        match self.info.get(&key.to_uppercase()) {
            Some(value) => value.as_deref(),
            None => default,
        }
    }

    /// Whether the catalog reported the attribute at all
    pub fn has_info(&self, key: &str) -> bool {
        self.info.contains_key(&key.to_uppercase())
    }

    /// All raw attributes
    pub fn attributes(&self) -> &CatalogRow {
        &self.info
    }

    /// Get column data type
    pub fn data_type(&self) -> Option<&str> {
        self.info("DATA_TYPE")
    }

    /// Full column type, e.g. `varchar(255)`
    pub fn column_type(&self) -> Option<&str> {
        self.info("COLUMN_TYPE")
    }

    /// Raw default expression
    pub fn default_value(&self) -> Option<&str> {
        self.info("COLUMN_DEFAULT")
    }

    /// Check column is nullable (IS_NULLABLE is exactly "YES")
    pub fn is_nullable(&self) -> bool {
        self.info("IS_NULLABLE") == Some("YES")
    }

    /// Get column comment
    pub fn comment(&self) -> Option<&str> {
        self.info("COLUMN_COMMENT")
    }

    /// Maximum character length; `None` for non-character columns
    pub fn length(&self) -> Option<u64> {
        self.info("CHARACTER_MAXIMUM_LENGTH")
            .and_then(|value| value.trim().parse().ok())
    }

    /// Get column character set
    pub fn charset(&self) -> Option<&str> {
        self.info("CHARACTER_SET_NAME")
    }

    /// Get column collation
    pub fn collation(&self) -> Option<&str> {
        self.info("COLLATION_NAME")
    }

    /// Get catalog name (TABLE_CATALOG)
    pub fn catalog_name(&self) -> Option<&str> {
        self.info("TABLE_CATALOG")
    }

    /// Check column is auto-increment
    pub fn is_auto_increment(&self) -> bool {
        matches!(
            self.info("EXTRA"),
            Some(AUTO_INCREMENT) | Some(AUTO_INCREMENT_LEGACY)
        )
    }

    /// 1-based ordinal position; 0 when unknown
    pub fn sort_order(&self) -> i64 {
        self.info("ORDINAL_POSITION")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Check column is a primary key (PRI)
    pub fn is_primary(&self) -> bool {
        self.has_key("PRI")
    }

    /// Check column has a unique key (UNI)
    pub fn is_unique(&self) -> bool {
        self.has_key("UNI")
    }

    /// Non-unique index (MUL)
    pub fn is_index(&self) -> bool {
        self.has_key("MUL")
    }

    /// Primary, unique or indexed
    pub fn is_indexed(&self) -> bool {
        self.is_primary() || self.is_index() || self.is_unique()
    }

    fn has_key(&self, key: &str) -> bool {
        self.info("COLUMN_KEY")
            .map(|value| value.eq_ignore_ascii_case(key))
            .unwrap_or(false)
    }

    /// Relations as reported by the catalog, loaded once per instance
    pub async fn raw_relations(&self) -> Result<&[RelationRef]> {
        let relations = self
            .relations
            .get_or_try_init(|| self.fetch_relations())
            .await?;
        Ok(relations.as_slice())
    }

    /// Related columns keyed `<table>.<column>`.
    ///
    /// Each call resolves the cached references into freshly loaded columns.
    pub async fn relations(&self) -> Result<IndexMap<String, Column>> {
        let mut resolved = IndexMap::new();
        for relation in self.raw_relations().await? {
            let column = self.resolve(relation).await?;
            resolved.insert(relation.key(), column);
        }
        Ok(resolved)
    }

    /// Whether any related column matches `target`
    pub async fn is_related_with<'t>(&self, target: impl Into<RelationTarget<'t>>) -> Result<bool> {
        let target = target.into();
        let relations = self.relations().await?;
        Ok(relations.values().any(|related| target.matches(related)))
    }

    async fn fetch_relations(&self) -> Result<Vec<RelationRef>> {
        let schema = self.database.name();
        let catalog = self.database.catalog();

        let outgoing = catalog
            .fetch(CatalogQuery::OutgoingRelations {
                schema,
                table: &self.table,
                column: &self.name,
            })
            .await?;
        let incoming = catalog
            .fetch(CatalogQuery::IncomingRelations {
                schema,
                table: &self.table,
                column: &self.name,
            })
            .await?;

        let relations = merge_relations(outgoing.iter().chain(incoming.iter()));
        tracing::debug!(
            table = %self.table,
            column = %self.name,
            count = relations.len(),
            "loaded column relations"
        );
        Ok(relations)
    }

    async fn resolve(&self, relation: &RelationRef) -> Result<Column> {
        let dangling = || ReflectError::DanglingRelation {
            table: relation.table.clone(),
            column: relation.column.clone(),
        };

        let table = self
            .database
            .table(&relation.table)
            .await?
            .ok_or_else(dangling)?;
        table.column(&relation.column).cloned().ok_or_else(dangling)
    }
}

/// Upper-case attribute names so lookups are case-insensitive
fn normalize(row: CatalogRow) -> CatalogRow {
    row.into_iter()
        .map(|(key, value)| (key.to_uppercase(), value))
        .collect()
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("table", &self.table)
            .field("name", &self.name)
            .field("info", &self.info)
            .finish()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column_type = self
            .column_type()
            .or_else(|| self.data_type())
            .unwrap_or("unknown");
        write!(f, "{}: {}", self.name, column_type)?;

        if self.is_primary() {
            write!(f, " PRIMARY KEY")?;
        }
        if self.is_unique() {
            write!(f, " UNIQUE")?;
        }
        if self.is_index() {
            write!(f, " INDEX")?;
        }
        if self.is_auto_increment() {
            write!(f, " AUTO_INCREMENT")?;
        }
        if !self.is_nullable() {
            write!(f, " NOT NULL")?;
        }
        if let Some(default) = self.default_value() {
            write!(f, " DEFAULT {}", default)?;
        }
        if let Some(comment) = self.comment().filter(|c| !c.is_empty()) {
            write!(f, " -- {}", comment)?;
        }

        Ok(())
    }
}
