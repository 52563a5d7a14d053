//! Domain error types
//!
//! All errors are domain-specific and don't leak third-party types to
//! callers. Per-submission failures are recovered inside the pipeline;
//! everything surfaced here aborts the current form.

use std::path::PathBuf;
use thiserror::Error;

/// Main Satchel error type
#[derive(Debug, Error)]
pub enum SatchelError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A submission or form file could not be parsed
    #[error("Can't parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Cryptography errors
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Export process errors
    #[error("Export error: {0}")]
    Export(String),
}

/// Cryptography-specific errors
///
/// These cover the decryption path for end-to-end-encrypted submissions;
/// every one of them causes the affected submission to be skipped. A
/// signature mismatch is not an error: the row is still written, tagged
/// through the submission's validation status.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The RSA-wrapped symmetric key could not be recovered
    #[error("Can't unwrap the submission key: {0}")]
    KeyUnwrap(String),

    /// A block cipher could not be constructed
    #[error("Can't initialize cipher: {0}")]
    CipherInit(String),

    /// A file failed to decrypt (block-size or padding error)
    #[error("Can't decrypt file {path}")]
    DecryptionFailed { path: PathBuf },

    /// A media file declared in the submission metadata is absent on disk
    #[error("Missing media file {name}")]
    MissingMedia { name: String },
}

impl From<std::io::Error> for SatchelError {
    fn from(err: std::io::Error) -> Self {
        SatchelError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for SatchelError {
    fn from(err: toml::de::Error) -> Self {
        SatchelError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satchel_error_display() {
        let err = SatchelError::Configuration("no export dir".to_string());
        assert_eq!(err.to_string(), "Configuration error: no export dir");
    }

    #[test]
    fn test_crypto_error_conversion() {
        let crypto = CryptoError::MissingMedia {
            name: "photo.jpg.enc".to_string(),
        };
        let err: SatchelError = crypto.into();
        assert!(matches!(err, SatchelError::Crypto(_)));
        assert_eq!(err.to_string(), "Missing media file photo.jpg.enc");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SatchelError = io_err.into();
        assert!(matches!(err, SatchelError::Io(_)));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let err = SatchelError::Export("boom".to_string());
        let _: &dyn std::error::Error = &err;
        let crypto = CryptoError::KeyUnwrap("bad base64".to_string());
        let _: &dyn std::error::Error = &crypto;
    }
}
