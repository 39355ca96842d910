//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON document (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `QUARRY_DEFAULT_CONNECTION` | `default` |
//! | `QUARRY_LOG_LEVEL` | `log_level` |
//! | `QUARRY_DEBUG` | `debug` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use quarry_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/database.toml").unwrap();
//! let mysql = settings.connection(None).unwrap();
//! ```

use std::path::Path;

use crate::error::{QuarryError, QuarryResult};
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Fields missing from the document keep their default values, including
/// fields nested inside each connection table.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> QuarryResult<Settings> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| QuarryError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_with_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> QuarryResult<Settings> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        QuarryError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> QuarryResult<Settings> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> QuarryResult<Settings> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| QuarryError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_with_defaults(json_value, "JSON")
}

/// Applies `QUARRY_*` environment variable overrides to a settings struct.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

/// Applies overrides using `lookup` to resolve each `QUARRY_*` key.
pub fn apply_overrides_from(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("QUARRY_DEFAULT_CONNECTION") {
        settings.default = val;
    }

    if let Some(val) = lookup("QUARRY_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("QUARRY_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }
}

// ============================================================
// Helpers
// ============================================================

fn merge_with_defaults(document: serde_json::Value, format: &str) -> QuarryResult<Settings> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        QuarryError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, document);
    serde_json::from_value(merged).map_err(|e| {
        QuarryError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. `override_val` wins.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
