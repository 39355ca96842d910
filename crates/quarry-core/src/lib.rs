//! # quarry-core
//!
//! Error types, connection settings and logging setup shared by the quarry
//! crates. This crate has no database dependencies.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Connection settings
//! - [`settings_loader`] - Loading settings from TOML/JSON and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{QuarryError, QuarryResult};
pub use settings::{ConnectionSettings, Settings};
