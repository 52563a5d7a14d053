//! Export pipeline: orchestration, progress and events

pub mod events;
pub mod pipeline;
pub mod tracker;

pub use events::{ExportEvent, ExportEventSink, RecordingEventSink, TracingEventSink};
pub use pipeline::{export, ExportConfiguration, ExportPipeline};
pub use tracker::ExportTracker;
