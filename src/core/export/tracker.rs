//! Export progress tracking
//!
//! Counts exported and skipped submissions against the total seen on disk
//! and publishes throttled progress events: at most one per step of the
//! total, refreshed when enough time has passed since the last report.

use crate::core::export::events::{ExportEvent, ExportEventSink};
use crate::domain::outcome::ExportOutcome;
use std::sync::Arc;
use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Per-form counters and progress publication.
pub struct ExportTracker {
    form_id: String,
    total: usize,
    exported: usize,
    skipped: usize,
    report_step: usize,
    last_reported: usize,
    last_report_at: Instant,
    sink: Arc<dyn ExportEventSink>,
}

impl ExportTracker {
    pub fn new(form_id: impl Into<String>, total: usize, sink: Arc<dyn ExportEventSink>) -> Self {
        Self {
            form_id: form_id.into(),
            total,
            exported: 0,
            skipped: 0,
            report_step: (total / 100).max(1),
            last_reported: 0,
            last_report_at: Instant::now(),
            sink,
        }
    }

    /// Publishes the start event.
    pub fn start(&mut self) {
        self.last_report_at = Instant::now();
        self.sink.publish(ExportEvent::Started {
            form_id: self.form_id.clone(),
            total: self.total,
        });
    }

    pub fn inc_exported(&mut self) {
        self.exported += 1;
        self.maybe_report();
    }

    pub fn inc_skipped(&mut self) {
        self.skipped += 1;
    }

    fn maybe_report(&mut self) {
        let due_by_count = self.exported - self.last_reported >= self.report_step;
        let due_by_time = self.last_report_at.elapsed() >= REPORT_INTERVAL;
        if due_by_count || due_by_time {
            self.publish_progress();
        }
    }

    fn publish_progress(&mut self) {
        self.last_reported = self.exported;
        self.last_report_at = Instant::now();
        self.sink.publish(ExportEvent::Progress {
            form_id: self.form_id.clone(),
            exported: self.exported,
            total: self.total,
        });
    }

    /// Publishes the final progress state.
    pub fn end(&mut self) {
        self.publish_progress();
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn exported(&self) -> usize {
        self.exported
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn outcome(&self) -> ExportOutcome {
        ExportOutcome::from_counts(self.total, self.exported, self.skipped)
    }

    /// Publishes the terminal event matching `outcome`.
    pub fn publish_outcome(&self, outcome: ExportOutcome) {
        let event = match outcome {
            ExportOutcome::AllExported => ExportEvent::Succeeded {
                form_id: self.form_id.clone(),
                total: self.total,
            },
            ExportOutcome::SomeSkipped => ExportEvent::PartiallySucceeded {
                form_id: self.form_id.clone(),
                exported: self.exported,
                total: self.total,
            },
            ExportOutcome::AllSkipped => ExportEvent::Failed {
                form_id: self.form_id.clone(),
                reason: "All submissions have been skipped".to_string(),
            },
        };
        self.sink.publish(event);
    }
}
