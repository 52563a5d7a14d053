//! Configuration schema types
//!
//! Maps the TOML configuration file onto typed structs with defaults and
//! per-section validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure, one section per concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatchelConfig {
    /// Where the form lives on disk
    pub form: FormSettings,

    /// Export destination and options
    pub export: ExportSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SatchelConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<(), String> {
        self.form.validate()?;
        self.export.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Form location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSettings {
    /// Directory holding the form definition and its `instances/` tree
    pub form_dir: PathBuf,

    /// Form definition file, relative to `form_dir`. Optional when the
    /// directory contains exactly one `.xml` file.
    #[serde(default)]
    pub form_file: Option<PathBuf>,
}

impl FormSettings {
    fn validate(&self) -> Result<(), String> {
        if self.form_dir.as_os_str().is_empty() {
            return Err("form_dir must not be empty".to_string());
        }
        Ok(())
    }
}

/// Export destination and options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Destination directory for CSV files (created if missing)
    pub export_dir: PathBuf,

    /// Truncate existing CSV files and write a fresh header. When false,
    /// rows are appended without a header.
    #[serde(default = "default_true")]
    pub overwrite_existing_files: bool,

    /// Inclusive lower bound on the submission date ("YYYY-MM-DD")
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper bound on the submission date ("YYYY-MM-DD")
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// RSA private key file (PKCS#8 PEM or DER), required for encrypted
    /// forms
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,

    /// Copy referenced media files next to the CSV output
    #[serde(default)]
    pub export_media: bool,

    /// Where media is copied; defaults to `<export_dir>/media`
    #[serde(default)]
    pub export_media_path: Option<PathBuf>,

    /// Unsupported: splitting select-multiple answers into one column per
    /// choice. Recognized so configs fail loudly instead of silently
    /// producing different output.
    #[serde(default)]
    pub split_select_multiples: bool,

    /// Unsupported: dropping group prefixes from column names
    #[serde(default)]
    pub remove_group_names: bool,

    /// Unsupported: GeoJSON sidecar output
    #[serde(default)]
    pub include_geojson: bool,
}

impl ExportSettings {
    fn validate(&self) -> Result<(), String> {
        if self.export_dir.as_os_str().is_empty() {
            return Err("export_dir must not be empty".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(format!(
                    "start_date {start} is after end_date {end}"
                ));
            }
        }
        if self.split_select_multiples {
            return Err("split_select_multiples is not supported".to_string());
        }
        if self.remove_group_names {
            return Err("remove_group_names is not supported".to_string());
        }
        if self.include_geojson {
            return Err("include_geojson is not supported".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to rotating files
    #[serde(default)]
    pub file_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_log_path")]
    pub file_path: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_enabled: false,
            file_path: default_log_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_path() -> String {
    "logs".to_string()
}
