//! Result type alias for Satchel

use super::errors::SatchelError;

/// Result type alias used throughout the library for fallible operations.
pub type Result<T> = std::result::Result<T, SatchelError>;
