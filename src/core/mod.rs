//! Business logic: submission store, parsing, crypto, CSV mapping and the
//! export pipeline.

pub mod cache;
pub mod crypto;
pub mod csv;
pub mod export;
pub mod store;
pub mod submission;
pub mod xml;
