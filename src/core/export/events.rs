//! Export progress events
//!
//! Progress is published through an injected sink instead of a global
//! event bus so host applications can wire their own panels and tests can
//! capture the stream deterministically.

use std::sync::Mutex;

/// Events published while a form exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Started {
        form_id: String,
        total: usize,
    },
    Progress {
        form_id: String,
        exported: usize,
        total: usize,
    },
    Succeeded {
        form_id: String,
        total: usize,
    },
    PartiallySucceeded {
        form_id: String,
        exported: usize,
        total: usize,
    },
    Failed {
        form_id: String,
        reason: String,
    },
}

/// Receives export events. Implementations must be cheap: the pipeline
/// publishes from its hot loop.
pub trait ExportEventSink: Send + Sync {
    fn publish(&self, event: ExportEvent);
}

/// Default sink: forwards events to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl ExportEventSink for TracingEventSink {
    fn publish(&self, event: ExportEvent) {
        match &event {
            ExportEvent::Started { form_id, total } => {
                tracing::info!(form_id = %form_id, total, "Export started");
            }
            ExportEvent::Progress {
                form_id,
                exported,
                total,
            } => {
                tracing::debug!(form_id = %form_id, exported, total, "Export progress");
            }
            ExportEvent::Succeeded { form_id, total } => {
                tracing::info!(form_id = %form_id, total, "Export succeeded");
            }
            ExportEvent::PartiallySucceeded {
                form_id,
                exported,
                total,
            } => {
                tracing::warn!(form_id = %form_id, exported, total, "Export partially succeeded");
            }
            ExportEvent::Failed { form_id, reason } => {
                tracing::error!(form_id = %form_id, reason = %reason, "Export failed");
            }
        }
    }
}

/// Captures events in memory, for tests and embedders that render their
/// own progress.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<ExportEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExportEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ExportEventSink for RecordingEventSink {
    fn publish(&self, event: ExportEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingEventSink::new();
        sink.publish(ExportEvent::Started {
            form_id: "f".to_string(),
            total: 2,
        });
        sink.publish(ExportEvent::Succeeded {
            form_id: "f".to_string(),
            total: 2,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ExportEvent::Started { .. }));
        assert!(matches!(events[1], ExportEvent::Succeeded { .. }));
    }
}
