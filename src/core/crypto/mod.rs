//! Crypto engine for end-to-end-encrypted submissions
//!
//! Submissions are encrypted with a hybrid scheme: a fresh 256-bit AES key
//! per submission, RSA-wrapped under the form's public key, one AES-CFB
//! cipher per file drawn from a deterministic IV schedule, and an
//! RSA-encrypted md5 signature over the decrypted artifacts.

pub mod cipher;
pub mod decrypt;

pub use cipher::{decrypt_signature, CipherFactory, FileDecryptor};
pub use decrypt::{
    build_signature_input, compute_digest, decrypt_file, md5_base64, strip_enc_extension,
};
