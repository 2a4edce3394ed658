//! Error types for reflect-mysql
//!
//! This module defines the error types returned by every catalog-touching
//! operation in the crate.

use thiserror::Error;

/// Result type alias for reflect-mysql
pub type Result<T> = std::result::Result<T, ReflectError>;

/// Main error type for reflect-mysql
#[derive(Error, Debug)]
pub enum ReflectError {
    /// The initial connection could not be established
    #[error("Connection to {target} failed: {source}")]
    Connection {
        /// Host or URL the connection was attempted against
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// A catalog query reported a driver-level error
    #[error("Query error in `{query}`: {message}")]
    Query {
        /// Statement (or query kind) that failed
        query: String,
        /// Underlying driver message
        message: String,
    },

    /// A relation points at a table or column that no longer exists
    #[error("Dangling relation: {table}.{column} not found in catalog")]
    DanglingRelation {
        /// Referenced table name
        table: String,
        /// Referenced column name
        column: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON fixture errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReflectError {
    /// Wrap a connection failure against `target`
    pub fn db_connection(target: impl Into<String>, source: sqlx::Error) -> Self {
        ReflectError::Connection {
            target: target.into(),
            source,
        }
    }

    /// Wrap a driver error raised while running `query`
    pub fn db_query(query: impl Into<String>, source: sqlx::Error) -> Self {
        ReflectError::Query {
            query: compact(&query.into()),
            message: source.to_string(),
        }
    }

    /// Build a query error from a plain message
    pub fn query(query: impl Into<String>, message: impl Into<String>) -> Self {
        ReflectError::Query {
            query: query.into(),
            message: message.into(),
        }
    }
}

/// Collapse whitespace so multi-line statements read on one line
fn compact(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_compacts_statement() {
        let err = ReflectError::db_query(
            "SELECT 1\n    FROM dual",
            sqlx::Error::Protocol("boom".to_string()),
        );
        match err {
            ReflectError::Query { query, message } => {
                assert_eq!(query, "SELECT 1 FROM dual");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_dangling_relation_display() {
        let err = ReflectError::DanglingRelation {
            table: "customers".to_string(),
            column: "id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Dangling relation: customers.id not found in catalog"
        );
    }
}
