//! Export command implementation

use crate::adapters::load_form_definition;
use crate::config::{load_config, runtime_configuration};
use crate::core::export::ExportPipeline;
use crate::domain::outcome::ExportOutcome;
use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Override the form directory from the configuration
    #[arg(long)]
    pub form_dir: Option<PathBuf>,

    /// Override the export directory from the configuration
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Only export submissions on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Only export submissions on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
}

impl ExportArgs {
    /// Executes the export command and returns the process exit code.
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Configuration validation failed");
                eprintln!("Configuration invalid: {e}");
                return Ok(2);
            }
        };

        // Apply CLI overrides
        if let Some(form_dir) = &self.form_dir {
            tracing::info!(form_dir = %form_dir.display(), "Overriding form dir from CLI");
            config.form.form_dir = form_dir.clone();
        }
        if let Some(export_dir) = &self.export_dir {
            tracing::info!(export_dir = %export_dir.display(), "Overriding export dir from CLI");
            config.export.export_dir = export_dir.clone();
        }
        if self.start_date.is_some() {
            config.export.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            config.export.end_date = self.end_date;
        }

        let runtime = match runtime_configuration(&config) {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "Can't resolve export configuration");
                eprintln!("Configuration invalid: {e}");
                return Ok(2);
            }
        };

        let form = match load_form_definition(
            &config.form.form_dir,
            config.form.form_file.as_deref(),
        ) {
            Ok(form) => form,
            Err(e) => {
                tracing::error!(error = %e, "Can't load form definition");
                eprintln!("Can't load form definition: {e}");
                return Ok(2);
            }
        };

        if !self.yes {
            println!("Export configuration:");
            println!("  Form: {} ({})", form.form_name(), form.form_id());
            println!("  Encrypted: {}", form.is_encrypted());
            println!("  Export dir: {}", runtime.export_dir.display());
            if !runtime.date_range.is_empty() {
                println!(
                    "  Date range: {} .. {}",
                    runtime
                        .date_range
                        .start()
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    runtime
                        .date_range
                        .end()
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            print!("Proceed with export? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Export cancelled.");
                return Ok(0);
            }
        }

        let form_id = form.form_id().to_string();
        let pipeline = ExportPipeline::new(form, runtime).with_cancellation(shutdown_signal);
        let outcome = match tokio::task::spawn_blocking(move || pipeline.run()).await? {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(form_id = %form_id, error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(5);
            }
        };

        let exit_code = match outcome {
            ExportOutcome::AllExported => {
                println!("Export completed: all submissions exported.");
                0
            }
            ExportOutcome::SomeSkipped => {
                println!("Export completed with skipped submissions, see the log for reasons.");
                1
            }
            ExportOutcome::AllSkipped => {
                println!("Export finished but every submission was skipped.");
                3
            }
        };
        Ok(exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_args_defaults() {
        let args = ExportArgs {
            yes: false,
            form_dir: None,
            export_dir: None,
            start_date: None,
            end_date: None,
        };

        assert!(!args.yes);
        assert!(args.form_dir.is_none());
        assert!(args.start_date.is_none());
    }
}
