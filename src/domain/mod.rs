//! Core domain types and models
//!
//! This module holds the vocabulary shared by every other layer: the form
//! schema [`model::Model`], the [`form::FormDefinition`] produced by the
//! loader, date filtering, the export outcome, and the error hierarchy.

pub mod daterange;
pub mod errors;
pub mod form;
pub mod model;
pub mod outcome;
pub mod result;

pub use daterange::DateRange;
pub use errors::{CryptoError, SatchelError};
pub use form::FormDefinition;
pub use model::{DataType, Model, ModelBuilder, ModelNode, NodeId, NodeKind};
pub use outcome::ExportOutcome;
pub use result::Result;
