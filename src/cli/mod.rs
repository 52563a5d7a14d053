//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// Satchel - field-survey submission exporter
#[derive(Parser, Debug)]
#[command(name = "satchel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "satchel.toml", env = "SATCHEL_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SATCHEL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a form's submissions into CSV files
    Export(commands::export::ExportArgs),

    /// Validate the configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}
