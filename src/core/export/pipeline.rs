//! Export orchestration
//!
//! One pipeline run is a single forward pass over a form's submissions:
//! enumerate, date-filter and sort, then parse → decrypt → validate → map
//! and append to the open CSV writers. The working set is one submission;
//! documents parsed during the date-read phase are recycled through a
//! bounded cache.

use crate::core::cache::ParseCache;
use crate::core::csv::{
    main_header, main_submission_row, repeat_header, repeat_rows, CsvTarget, MediaOptions,
};
use crate::core::export::events::{ExportEvent, ExportEventSink, TracingEventSink};
use crate::core::export::tracker::ExportTracker;
use crate::core::store;
use crate::core::submission::{parse_submission, read_submission_date};
use crate::domain::daterange::DateRange;
use crate::domain::errors::SatchelError;
use crate::domain::form::FormDefinition;
use crate::domain::model::NodeId;
use crate::domain::outcome::ExportOutcome;
use crate::domain::result::Result;
use rsa::RsaPrivateKey;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Recognized export options, already resolved to runtime values.
#[derive(Debug, Clone)]
pub struct ExportConfiguration {
    pub export_dir: PathBuf,
    pub overwrite_existing_files: bool,
    pub date_range: DateRange,
    pub private_key: Option<RsaPrivateKey>,
    pub export_media: bool,
    pub export_media_path: Option<PathBuf>,
}

impl ExportConfiguration {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            overwrite_existing_files: true,
            date_range: DateRange::empty(),
            private_key: None,
            export_media: false,
            export_media_path: None,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_existing_files = overwrite;
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    pub fn with_private_key(mut self, key: RsaPrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn with_media_export(mut self, path: Option<PathBuf>) -> Self {
        self.export_media = true;
        self.export_media_path = path;
        self
    }

    /// Where referenced media is copied; defaults to `export_dir/media`.
    pub fn media_dir(&self) -> PathBuf {
        self.export_media_path
            .clone()
            .unwrap_or_else(|| self.export_dir.join("media"))
    }
}

/// Orchestrates the export of one form.
pub struct ExportPipeline {
    form: FormDefinition,
    config: ExportConfiguration,
    sink: Arc<dyn ExportEventSink>,
    cancel: watch::Receiver<bool>,
}

impl ExportPipeline {
    pub fn new(form: FormDefinition, config: ExportConfiguration) -> Self {
        Self {
            form,
            config,
            sink: Arc::new(TracingEventSink),
            cancel: never_cancelled(),
        }
    }

    /// Replaces the default tracing sink, e.g. with a recording sink.
    pub fn with_event_sink(mut self, sink: Arc<dyn ExportEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Installs a cancellation token checked between submissions.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the export and returns the aggregate outcome.
    ///
    /// Per-submission failures are counted as skipped and the pass
    /// continues; configuration and write failures abort the form. Writers
    /// are flushed and temporary working directories removed on every exit
    /// path.
    pub fn run(&self) -> Result<ExportOutcome> {
        let result = self.run_inner();
        if let Err(e) = &result {
            self.sink.publish(ExportEvent::Failed {
                form_id: self.form.form_id().to_string(),
                reason: e.to_string(),
            });
        }
        result
    }

    fn run_inner(&self) -> Result<ExportOutcome> {
        let start = Instant::now();
        let form = &self.form;
        let config = &self.config;

        if form.is_encrypted() && config.private_key.is_none() {
            return Err(SatchelError::Configuration(
                "form is encrypted but no private key is configured".to_string(),
            ));
        }

        let instances = store::list_instances(form.form_dir());
        let mut tracker =
            ExportTracker::new(form.form_id(), instances.len(), self.sink.clone());
        tracker.start();

        fs::create_dir_all(&config.export_dir)?;

        let model = form.model();
        let base_name = form.safe_base_name();
        let mut repeat_targets: Vec<(NodeId, CsvTarget)> = Vec::new();
        for repeat in model.repeatable_fields() {
            let path = config
                .export_dir
                .join(format!("{base_name}-{}.csv", model.node(repeat).name()));
            let target = CsvTarget::open(
                &path,
                config.overwrite_existing_files,
                &repeat_header(model, repeat),
            )?;
            repeat_targets.push((repeat, target));
        }
        let main_path = config.export_dir.join(format!("{base_name}.csv"));
        let mut main_target = CsvTarget::open(
            &main_path,
            config.overwrite_existing_files,
            &main_header(model, form.is_encrypted()),
        )?;

        // Date-read phase: learn each submission's date, filter, sort.
        // Parsed documents go into the cache for the export phase.
        let cache = ParseCache::default();
        let mut ordered: Vec<(i64, PathBuf)> = Vec::new();
        for instance_dir in instances {
            let path = instance_dir.join("submission.xml");
            let date = read_submission_date(&path, &cache);
            if !config.date_range.contains(date) {
                tracing::debug!(path = %path.display(), "Outside date range, skipping");
                tracker.inc_skipped();
                continue;
            }
            let sort_key = date.map(|d| d.timestamp_millis()).unwrap_or(i64::MIN);
            ordered.push((sort_key, path));
        }
        ordered.sort();

        let media = MediaOptions {
            export_media: config.export_media,
            media_dir: config.media_dir(),
        };

        let mut cancelled = false;
        for (_, path) in &ordered {
            if *self.cancel.borrow() {
                cancelled = true;
                break;
            }
            let submission = match parse_submission(
                path,
                form.is_encrypted(),
                config.private_key.as_ref(),
                &cache,
            ) {
                Some(submission) => submission,
                None => {
                    tracker.inc_skipped();
                    continue;
                }
            };

            for (repeat, target) in repeat_targets.iter_mut() {
                let rows = repeat_rows(model, *repeat, &submission, &media)?;
                if !rows.is_empty() {
                    target.append(&rows)?;
                }
            }
            let row = main_submission_row(model, &submission, form.is_encrypted(), &media)?;
            main_target.append(&row)?;
            tracker.inc_exported();
        }

        main_target.flush()?;
        for (_, target) in repeat_targets.iter_mut() {
            target.flush()?;
        }
        tracker.end();

        let outcome = tracker.outcome();
        tracker.publish_outcome(outcome);
        tracing::info!(
            form_id = %form.form_id(),
            exported = tracker.exported(),
            skipped = tracker.skipped(),
            total = tracker.total(),
            cancelled,
            duration_ms = start.elapsed().as_millis(),
            outcome = %outcome,
            "Export finished"
        );
        Ok(outcome)
    }
}

/// Exports a form with the default sink and no cancellation.
pub fn export(form: FormDefinition, config: ExportConfiguration) -> Result<ExportOutcome> {
    ExportPipeline::new(form, config).run()
}

fn never_cancelled() -> watch::Receiver<bool> {
    let (_tx, rx) = watch::channel(false);
    rx
}
