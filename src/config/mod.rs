//! Configuration management
//!
//! TOML-based configuration with `${VAR}` environment substitution and
//! validation on load. The CLI resolves the parsed settings into the
//! runtime [`crate::core::export::ExportConfiguration`].

pub mod loader;
pub mod schema;

pub use loader::{load_config, load_private_key, runtime_configuration};
pub use schema::{ExportSettings, FormSettings, LoggingConfig, SatchelConfig};
