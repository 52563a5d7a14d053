//! External-format adapters
//!
//! The export core consumes a read-only [`crate::domain::FormDefinition`];
//! this module produces one from on-disk XForms documents.

pub mod xform;

pub use xform::load_form_definition;
