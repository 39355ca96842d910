//! Connection settings for quarry.
//!
//! [`Settings`] names a default connection and holds every configured
//! connection by name. It is usually loaded through
//! [`settings_loader`](crate::settings_loader).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, QuarryResult};

/// Configuration for a single named connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// The driver family (e.g. `mysql`, `sqlite`). Selects the SQL grammar.
    pub driver: String,
    /// The database host.
    pub host: String,
    /// The database port.
    pub port: u16,
    /// The database name (or file path for `SQLite`).
    pub database: String,
    /// The database user.
    pub username: String,
    /// The database password.
    pub password: String,
    /// Overrides the grammar's placeholder symbol when set.
    pub placeholder: Option<String>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            driver: "mysql".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3306,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            placeholder: None,
        }
    }
}

/// Top-level quarry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name of the connection used when none is requested explicitly.
    pub default: String,
    /// Every configured connection, keyed by name.
    pub connections: HashMap<String, ConnectionSettings>,
    /// A `tracing` filter directive (e.g. `info`, `quarry_db=debug`).
    pub log_level: String,
    /// Enables human-readable log output.
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default: "mysql".to_string(),
            connections: HashMap::new(),
            log_level: "info".to_string(),
            debug: false,
        }
    }
}

impl Settings {
    /// Looks up a connection by name, falling back to the default connection
    /// when `name` is `None` or empty.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::ConfigurationError`] if no connection with the
    /// resolved name is configured.
    pub fn connection(&self, name: Option<&str>) -> QuarryResult<&ConnectionSettings> {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => self.default.as_str(),
        };
        self.connections.get(name).ok_or_else(|| {
            QuarryError::ConfigurationError(format!("Database connection [{name}] not configured"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(name: &str, driver: &str) -> Settings {
        let mut settings = Settings::default();
        settings.connections.insert(
            name.to_string(),
            ConnectionSettings {
                driver: driver.to_string(),
                ..ConnectionSettings::default()
            },
        );
        settings
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default, "mysql");
        assert!(settings.connections.is_empty());
        assert_eq!(settings.log_level, "info");
        assert!(!settings.debug);
    }

    #[test]
    fn test_connection_by_name() {
        let settings = settings_with("analytics", "sqlite");
        let conn = settings.connection(Some("analytics")).unwrap();
        assert_eq!(conn.driver, "sqlite");
    }

    #[test]
    fn test_connection_falls_back_to_default() {
        let settings = settings_with("mysql", "mysql");
        assert!(settings.connection(None).is_ok());
        assert!(settings.connection(Some("")).is_ok());
    }

    #[test]
    fn test_missing_connection() {
        let settings = settings_with("mysql", "mysql");
        let err = settings.connection(Some("reporting")).unwrap_err();
        assert!(matches!(err, QuarryError::ConfigurationError(_)));
        assert!(err.to_string().contains("reporting"));
    }

    #[test]
    fn test_settings_serde_roundtrip() {
        let settings = settings_with("mysql", "mysql");
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
