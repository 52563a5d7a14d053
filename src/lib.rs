// Satchel - Field-Survey Submission Exporter
// Copyright (c) 2025 Satchel Contributors
// Licensed under the MIT License

//! # Satchel - field-survey submission exporter
//!
//! Satchel materializes survey-form submissions - collected by field
//! devices and stored locally as a tree of XML instance directories - into
//! flat, tabular CSV files suitable for analysis: one main CSV per form
//! (one row per submission) plus one CSV per repeat group, with rows keyed
//! back to their parent.
//!
//! It filters submissions by date range, decrypts end-to-end-encrypted
//! submissions (hybrid RSA-per-submission / AES-per-file with signature
//! validation), optionally copies referenced media files, and reports a
//! per-form [`domain::ExportOutcome`].
//!
//! ## Architecture
//!
//! - [`cli`] - command-line interface and argument parsing
//! - [`config`] - TOML configuration loading and validation
//! - [`adapters`] - the XForms form-definition loader
//! - [`core`] - submission store, parsing, crypto, CSV mapping, pipeline
//! - [`domain`] - schema model, form definition, outcomes, errors
//! - [`logging`] - structured logging setup
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use satchel::adapters::load_form_definition;
//! use satchel::core::export::{export, ExportConfiguration};
//! use satchel::domain::Result;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let form = load_form_definition(Path::new("/data/forms/household"), None)?;
//!     let config = ExportConfiguration::new("/data/export");
//!     let outcome = export(form, config)?;
//!     println!("export finished: {outcome}");
//!     Ok(())
//! }
//! ```
//!
//! Progress can be observed by injecting an event sink, and a running
//! export cancelled through a watch channel:
//!
//! ```rust,no_run
//! use satchel::adapters::load_form_definition;
//! use satchel::core::export::{ExportConfiguration, ExportPipeline, RecordingEventSink};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> satchel::domain::Result<()> {
//! let form = load_form_definition(Path::new("/data/forms/household"), None)?;
//! let sink = Arc::new(RecordingEventSink::new());
//! let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
//!
//! let pipeline = ExportPipeline::new(form, ExportConfiguration::new("/data/export"))
//!     .with_event_sink(sink.clone())
//!     .with_cancellation(cancel_rx);
//! let outcome = pipeline.run()?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
