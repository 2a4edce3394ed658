//! Configuration module
//!
//! Connection parameters for reflecting a MySQL schema, loadable from a
//! TOML file or built in code.

use crate::error::{Result, ReflectError};
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;
use std::fs;
use std::path::Path;

/// Default MySQL port
pub const DEFAULT_PORT: u16 = 3306;

/// Default pool size
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user
    pub username: String,
    /// Login password
    #[serde(default)]
    pub password: Option<String>,
    /// Schema to reflect; also the default database of the connection
    pub database: String,
    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl ConnectionConfig {
    /// Create a configuration with default port and pool size
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: Option<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password,
            database: database.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check that required fields are usable
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ReflectError::Config("host must not be empty".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(ReflectError::Config(
                "database must not be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ReflectError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection target used in logs and errors; never includes the password
    pub fn target(&self) -> String {
        format!("{}@{}:{}/{}", self.username, self.host, self.port, self.database)
    }

    /// Build sqlx connect options
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.database);

        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_defaults() {
        let config = ConnectionConfig::from_toml_str(
            r#"
            host = "localhost"
            username = "root"
            database = "shop"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 3306);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.password, None);
        assert_eq!(config.target(), "root@localhost:3306/shop");
    }

    #[test]
    fn test_from_toml_full() {
        let config = ConnectionConfig::from_toml_str(
            r#"
            host = "db.internal"
            port = 3307
            username = "reader"
            password = "secret"
            database = "inventory"
            max_connections = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 3307);
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert!(!config.target().contains("secret"));
    }

    #[test]
    fn test_rejects_empty_database() {
        let err = ConnectionConfig::from_toml_str(
            r#"
            host = "localhost"
            username = "root"
            database = ""
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ReflectError::Config(_)));
    }

    #[test]
    fn test_rejects_missing_fields() {
        let err = ConnectionConfig::from_toml_str("host = \"localhost\"").unwrap_err();
        assert!(matches!(err, ReflectError::Toml(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConnectionConfig::load("/nonexistent/reflect-mysql.toml").unwrap_err();
        assert!(matches!(err, ReflectError::Io(_)));
    }
}
