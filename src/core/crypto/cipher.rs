//! Per-submission cipher derivation
//!
//! Encrypted forms wrap a 256-bit AES key under the form's RSA public key
//! and store it base64-encoded in the submission envelope. The factory
//! unwraps that key and hands out one AES-256-CFB cipher per file, in the
//! fixed order the collection side encrypted them: declared media first,
//! the submission payload last.
//!
//! The IV schedule must stay byte-compatible with the collection side:
//! the seed is `md5(instance_id || key)`, and before issuing cipher `n`
//! (0-based) the byte at `n % 16` is wrapping-incremented. Mutations
//! accumulate across ciphers.

use crate::domain::errors::CryptoError;
use aes::Aes256;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cfb_mode::cipher::KeyIvInit;
use cfb_mode::BufDecryptor;
use md5::{Digest, Md5};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};

/// AES block and IV length in bytes.
pub const IV_LENGTH: usize = 16;

/// Length of the unwrapped symmetric key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Streaming AES-256-CFB decryptor for one file.
pub type FileDecryptor = BufDecryptor<Aes256>;

/// Derives the per-file cipher sequence of one encrypted submission.
pub struct CipherFactory {
    key: [u8; KEY_LENGTH],
    iv_seed: [u8; IV_LENGTH],
    counter: usize,
}

impl CipherFactory {
    /// Unwraps the symmetric key and prepares the IV schedule.
    pub fn new(
        instance_id: &str,
        base64_encrypted_key: &str,
        private_key: &RsaPrivateKey,
    ) -> Result<Self, CryptoError> {
        let wrapped = BASE64
            .decode(base64_encrypted_key.trim())
            .map_err(|e| CryptoError::KeyUnwrap(format!("invalid base64 key: {e}")))?;
        let key_bytes = private_key
            .decrypt(Pkcs1v15Encrypt, &wrapped)
            .map_err(|e| CryptoError::KeyUnwrap(e.to_string()))?;
        let key: [u8; KEY_LENGTH] = key_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::KeyUnwrap(format!(
                "unexpected symmetric key length {}",
                key_bytes.len()
            ))
        })?;

        let mut hasher = Md5::new();
        hasher.update(instance_id.as_bytes());
        hasher.update(key);
        let digest = hasher.finalize();
        let mut iv_seed = [0u8; IV_LENGTH];
        iv_seed.copy_from_slice(&digest);

        Ok(Self {
            key,
            iv_seed,
            counter: 0,
        })
    }

    /// Issues the next file cipher in sequence. Never reuses an IV.
    pub fn next_decryptor(&mut self) -> Result<FileDecryptor, CryptoError> {
        let slot = self.counter % IV_LENGTH;
        self.iv_seed[slot] = self.iv_seed[slot].wrapping_add(1);
        self.counter += 1;
        FileDecryptor::new_from_slices(&self.key, &self.iv_seed)
            .map_err(|e| CryptoError::CipherInit(e.to_string()))
    }

    /// Base64 of the wrapped key exactly as it appears in the envelope is
    /// part of the signature input; the unwrapped key never leaves the
    /// factory except through the ciphers it builds.
    pub fn key_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for CipherFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs
        f.debug_struct("CipherFactory")
            .field("counter", &self.counter)
            .finish()
    }
}

/// Decrypts the RSA-encrypted, base64-encoded submission signature field.
pub fn decrypt_signature(
    private_key: &RsaPrivateKey,
    base64_signature: &str,
) -> Result<Vec<u8>, CryptoError> {
    let wrapped = BASE64
        .decode(base64_signature.trim())
        .map_err(|e| CryptoError::KeyUnwrap(format!("invalid base64 signature: {e}")))?;
    private_key
        .decrypt(Pkcs1v15Encrypt, &wrapped)
        .map_err(|e| CryptoError::KeyUnwrap(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rsa::RsaPublicKey;

    fn test_key() -> RsaPrivateKey {
        let mut rng = StdRng::seed_from_u64(7);
        RsaPrivateKey::new(&mut rng, 2048).unwrap()
    }

    fn wrap_key(symmetric: &[u8; KEY_LENGTH], private_key: &RsaPrivateKey) -> String {
        let mut rng = StdRng::seed_from_u64(11);
        let public = RsaPublicKey::from(private_key);
        BASE64.encode(public.encrypt(&mut rng, Pkcs1v15Encrypt, symmetric).unwrap())
    }

    #[test]
    fn test_unwraps_symmetric_key() {
        let private_key = test_key();
        let symmetric = [0x42u8; KEY_LENGTH];
        let wrapped = wrap_key(&symmetric, &private_key);

        let factory = CipherFactory::new("uuid:1", &wrapped, &private_key).unwrap();
        assert_eq!(factory.key_bytes(), &symmetric);
    }

    #[test]
    fn test_iv_schedule_matches_collection_side() {
        let private_key = test_key();
        let symmetric = [0x07u8; KEY_LENGTH];
        let wrapped = wrap_key(&symmetric, &private_key);

        let mut factory = CipherFactory::new("uuid:abc", &wrapped, &private_key).unwrap();

        let mut hasher = Md5::new();
        hasher.update(b"uuid:abc");
        hasher.update(symmetric);
        let mut expected: [u8; IV_LENGTH] = hasher.finalize().into();

        // First cipher increments byte 0, second increments byte 1 on top
        // of the already-mutated seed.
        factory.next_decryptor().unwrap();
        expected[0] = expected[0].wrapping_add(1);
        assert_eq!(factory.iv_seed, expected);

        factory.next_decryptor().unwrap();
        expected[1] = expected[1].wrapping_add(1);
        assert_eq!(factory.iv_seed, expected);
    }

    #[test]
    fn test_bad_base64_key_is_rejected() {
        let private_key = test_key();
        let err = CipherFactory::new("uuid:1", "!!!not-base64!!!", &private_key).unwrap_err();
        assert!(matches!(err, CryptoError::KeyUnwrap(_)));
    }

    #[test]
    fn test_garbage_wrapped_key_is_rejected() {
        let private_key = test_key();
        let garbage = BASE64.encode([0u8; 256]);
        let err = CipherFactory::new("uuid:1", &garbage, &private_key).unwrap_err();
        assert!(matches!(err, CryptoError::KeyUnwrap(_)));
    }

    #[test]
    fn test_signature_decrypt_round_trip() {
        let private_key = test_key();
        let public = RsaPublicKey::from(&private_key);
        let mut rng = StdRng::seed_from_u64(13);
        let digest = [0xABu8; 16];
        let encrypted = BASE64.encode(public.encrypt(&mut rng, Pkcs1v15Encrypt, &digest).unwrap());

        let decrypted = decrypt_signature(&private_key, &encrypted).unwrap();
        assert_eq!(decrypted, digest);
    }
}
