//! validate-config command

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Validates the configuration file and reports the result.
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match load_config(config_path) {
            Ok(config) => {
                println!("Configuration is valid: {config_path}");
                println!("  Form dir: {}", config.form.form_dir.display());
                println!("  Export dir: {}", config.export.export_dir.display());
                println!(
                    "  Encrypted-form key: {}",
                    config
                        .export
                        .private_key_file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Configuration validation failed");
                eprintln!("Configuration invalid: {e}");
                Ok(2)
            }
        }
    }
}
