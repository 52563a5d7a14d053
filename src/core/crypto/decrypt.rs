//! Streaming file decryption and signature validation

use crate::core::crypto::cipher::{FileDecryptor, IV_LENGTH};
use crate::domain::errors::{CryptoError, SatchelError};
use crate::domain::result::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Read granularity for streaming decryption and hashing.
const BUFFER_SIZE: usize = 2048;

/// Drops the final extension: `photo.jpg.enc` → `photo.jpg`.
pub fn strip_enc_extension(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name[..idx].to_string(),
        _ => file_name.to_string(),
    }
}

/// Decrypts `encrypted_path` into `working_dir`, streaming 2 KiB at a
/// time, and returns the path of the plaintext file.
///
/// The collection side pads the plaintext (PKCS#5), so the trailing block
/// is withheld until end-of-stream and the padding validated and removed
/// there. Invalid padding means the wrong key or a corrupt file.
pub fn decrypt_file(
    encrypted_path: &Path,
    working_dir: &Path,
    mut decryptor: FileDecryptor,
) -> Result<PathBuf> {
    let file_name = encrypted_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SatchelError::Io(format!("bad file name: {}", encrypted_path.display())))?;
    let output_path = working_dir.join(strip_enc_extension(file_name));

    let mut input = File::open(encrypted_path)?;
    let mut output = BufWriter::new(File::create(&output_path)?);

    let mut buf = [0u8; BUFFER_SIZE];
    let mut tail: Vec<u8> = Vec::with_capacity(BUFFER_SIZE + IV_LENGTH);
    loop {
        let read = input.read(&mut buf)?;
        if read == 0 {
            break;
        }
        let mut chunk = buf[..read].to_vec();
        decryptor.decrypt(&mut chunk);
        tail.extend_from_slice(&chunk);
        // Keep one block back in case it carries the padding
        if tail.len() > IV_LENGTH {
            let flush = tail.len() - IV_LENGTH;
            output.write_all(&tail[..flush])?;
            tail.drain(..flush);
        }
    }

    let unpadded = strip_pkcs5(&tail).ok_or(CryptoError::DecryptionFailed {
        path: encrypted_path.to_path_buf(),
    })?;
    output.write_all(unpadded)?;
    output.flush()?;
    Ok(output_path)
}

/// Validates and removes PKCS#5 padding from the final block.
fn strip_pkcs5(tail: &[u8]) -> Option<&[u8]> {
    let last = *tail.last()?;
    let pad = last as usize;
    if pad == 0 || pad > IV_LENGTH || pad > tail.len() {
        return None;
    }
    if tail[tail.len() - pad..].iter().any(|b| *b != last) {
        return None;
    }
    Some(&tail[..tail.len() - pad])
}

/// Base64 of the md5 digest of a file's contents, streamed.
pub fn md5_base64(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; BUFFER_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(BASE64.encode(hasher.finalize()))
}

/// Builds the canonical signature input for a decrypted submission.
///
/// Parts, each followed by a newline: form id, form version when present,
/// the base64 wrapped-key string as found in the envelope, instance id,
/// then `name::base64(md5(bytes))` for every decrypted media file in
/// declared order and for the decrypted submission payload last.
pub fn build_signature_input(
    form_id: &str,
    form_version: Option<&str>,
    base64_encrypted_key: &str,
    instance_id: &str,
    decrypted_files: &[PathBuf],
) -> Result<String> {
    let mut input = String::new();
    input.push_str(form_id);
    input.push('\n');
    if let Some(version) = form_version {
        input.push_str(version);
        input.push('\n');
    }
    input.push_str(base64_encrypted_key);
    input.push('\n');
    input.push_str(instance_id);
    input.push('\n');
    for path in decrypted_files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SatchelError::Io(format!("bad file name: {}", path.display())))?;
        input.push_str(name);
        input.push_str("::");
        input.push_str(&md5_base64(path)?);
        input.push('\n');
    }
    Ok(input)
}

/// md5 over the canonical signature input.
pub fn compute_digest(signature_input: &str) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(signature_input.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::cipher::KEY_LENGTH;
    use cfb_mode::cipher::KeyIvInit;
    use cfb_mode::{BufDecryptor, BufEncryptor};
    use std::fs;
    use tempfile::TempDir;

    fn encrypt_fixture(plain: &[u8], key: &[u8; KEY_LENGTH], iv: &[u8; IV_LENGTH]) -> Vec<u8> {
        let mut padded = plain.to_vec();
        let pad = IV_LENGTH - (padded.len() % IV_LENGTH);
        padded.extend(std::iter::repeat(pad as u8).take(pad));
        let mut enc = BufEncryptor::<aes::Aes256>::new_from_slices(key, iv).unwrap();
        enc.encrypt(&mut padded);
        padded
    }

    #[test]
    fn test_strip_enc_extension() {
        assert_eq!(strip_enc_extension("submission.xml.enc"), "submission.xml");
        assert_eq!(strip_enc_extension("photo.jpg"), "photo");
        assert_eq!(strip_enc_extension("noext"), "noext");
        assert_eq!(strip_enc_extension(".hidden"), ".hidden");
    }

    #[test]
    fn test_decrypt_file_round_trip() {
        let tmp = TempDir::new().unwrap();
        let key = [9u8; KEY_LENGTH];
        let iv = [3u8; IV_LENGTH];
        // Larger than one read so the streaming path is exercised
        let plain: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();

        let enc_path = tmp.path().join("photo.jpg.enc");
        fs::write(&enc_path, encrypt_fixture(&plain, &key, &iv)).unwrap();

        let decryptor = BufDecryptor::<aes::Aes256>::new_from_slices(&key, &iv).unwrap();
        let out = decrypt_file(&enc_path, tmp.path(), decryptor).unwrap();

        assert_eq!(out.file_name().unwrap(), "photo.jpg");
        assert_eq!(fs::read(&out).unwrap(), plain);
    }

    #[test]
    fn test_wrong_key_fails_padding_check() {
        let tmp = TempDir::new().unwrap();
        let key = [9u8; KEY_LENGTH];
        let iv = [3u8; IV_LENGTH];
        let enc_path = tmp.path().join("data.bin.enc");
        fs::write(&enc_path, encrypt_fixture(b"some payload", &key, &iv)).unwrap();

        let wrong_key = [8u8; KEY_LENGTH];
        let decryptor = BufDecryptor::<aes::Aes256>::new_from_slices(&wrong_key, &iv).unwrap();
        let err = decrypt_file(&enc_path, tmp.path(), decryptor).unwrap_err();
        assert!(matches!(
            err,
            SatchelError::Crypto(CryptoError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_strip_pkcs5_rejects_bad_padding() {
        assert!(strip_pkcs5(&[1, 2, 3, 0]).is_none());
        assert!(strip_pkcs5(&[1, 2, 3, 17]).is_none());
        assert!(strip_pkcs5(&[1, 2, 2, 3]).is_none());
        assert_eq!(strip_pkcs5(&[1, 2, 2, 2]).unwrap(), &[1]);
        assert_eq!(strip_pkcs5(&[4, 4, 4, 4]).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn test_signature_input_layout() {
        let tmp = TempDir::new().unwrap();
        let media = tmp.path().join("photo.jpg");
        fs::write(&media, b"pixels").unwrap();
        let submission = tmp.path().join("submission.xml");
        fs::write(&submission, b"<data/>").unwrap();

        let input = build_signature_input(
            "form-1",
            Some("3"),
            "WRAPPEDKEY==",
            "uuid:1",
            &[media.clone(), submission.clone()],
        )
        .unwrap();

        let expected = format!(
            "form-1\n3\nWRAPPEDKEY==\nuuid:1\nphoto.jpg::{}\nsubmission.xml::{}\n",
            md5_base64(&media).unwrap(),
            md5_base64(&submission).unwrap(),
        );
        assert_eq!(input, expected);
    }

    #[test]
    fn test_signature_input_omits_absent_version() {
        let input = build_signature_input("form-1", None, "K==", "uuid:1", &[]).unwrap();
        assert_eq!(input, "form-1\nK==\nuuid:1\n");
    }

    #[test]
    fn test_compute_digest_is_md5_of_utf8() {
        let digest = compute_digest("abc");
        let mut hasher = Md5::new();
        hasher.update(b"abc");
        let expected: [u8; 16] = hasher.finalize().into();
        assert_eq!(digest, expected);
    }
}
