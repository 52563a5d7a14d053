//! Submission parsing and decryption
//!
//! A submission is one completed answer set: a `submission.xml` document
//! plus optional media and, for encrypted forms, ciphertext files. Parsing
//! reads the metadata out of the (possibly enveloped) document; for
//! encrypted forms the payload and media are decrypted into a temporary
//! working directory and the document root is replaced with the decrypted
//! one before any rows are produced.

use crate::core::cache::ParseCache;
use crate::core::crypto::{
    build_signature_input, compute_digest, decrypt_file, decrypt_signature, CipherFactory,
};
use crate::core::xml::{self, XmlElement};
use crate::domain::errors::CryptoError;
use chrono::{DateTime, FixedOffset};
use rsa::RsaPrivateKey;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// Result of validating a decrypted submission against its signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    NotValidated,
    Valid,
    NotValid,
}

impl ValidationStatus {
    pub fn of(is_valid: bool) -> Self {
        if is_valid {
            ValidationStatus::Valid
        } else {
            ValidationStatus::NotValid
        }
    }

    /// Cell value for the `isValidated` column.
    pub fn as_cell(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "True",
            _ => "False",
        }
    }
}

/// Metadata read from the submission document (for encrypted forms, from
/// the envelope).
#[derive(Debug, Clone, Default)]
pub struct SubmissionMetaData {
    instance_id: Option<String>,
    submission_date: Option<DateTime<FixedOffset>>,
    form_id: Option<String>,
    version: Option<String>,
    base64_encrypted_key: Option<String>,
    encrypted_signature: Option<String>,
    media_names: Vec<String>,
    encrypted_xml_file: Option<String>,
}

impl SubmissionMetaData {
    pub fn from_root(root: &XmlElement) -> Self {
        let instance_id = root
            .find_first("instanceID")
            .and_then(|e| e.value())
            .map(str::to_string)
            .or_else(|| root.attribute("instanceID").map(str::to_string));
        let submission_date = root
            .attribute("submissionDate")
            .and_then(parse_submission_date);
        let form_id = root
            .attribute("id")
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let version = root
            .attribute("version")
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let base64_encrypted_key = root
            .child("base64EncryptedKey")
            .and_then(|e| e.value())
            .map(str::to_string);
        let encrypted_signature = root
            .find_first("base64EncryptedElementSignature")
            .and_then(|e| e.value())
            .map(str::to_string);
        let media_names = root
            .children_named("media")
            .flat_map(|m| m.children_named("file"))
            .filter_map(|f| f.value())
            .map(str::to_string)
            .collect();
        let encrypted_xml_file = root
            .child("encryptedXmlFile")
            .and_then(|e| e.value())
            .map(str::to_string);

        Self {
            instance_id,
            submission_date,
            form_id,
            version,
            base64_encrypted_key,
            encrypted_signature,
            media_names,
            encrypted_xml_file,
        }
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn submission_date(&self) -> Option<DateTime<FixedOffset>> {
        self.submission_date
    }

    pub fn form_id(&self) -> Option<&str> {
        self.form_id.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn base64_encrypted_key(&self) -> Option<&str> {
        self.base64_encrypted_key.as_deref()
    }

    pub fn encrypted_signature(&self) -> Option<&str> {
        self.encrypted_signature.as_deref()
    }

    /// Declared media file names, in declaration order.
    pub fn media_names(&self) -> &[String] {
        &self.media_names
    }

    pub fn encrypted_xml_file(&self) -> Option<&str> {
        self.encrypted_xml_file.as_deref()
    }
}

/// Submission dates come from OpenRosa servers in RFC 3339 with either a
/// `Z`/`+hh:mm` offset or the legacy `+hhmm` form.
pub fn parse_submission_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// Where a submission's readable files live. Encrypted submissions own a
/// temporary directory that is removed when the submission is dropped.
#[derive(Debug)]
pub enum WorkingDir {
    Source(PathBuf),
    Temp(TempDir),
}

impl WorkingDir {
    pub fn path(&self) -> &Path {
        match self {
            WorkingDir::Source(path) => path,
            WorkingDir::Temp(dir) => dir.path(),
        }
    }
}

/// A parsed (and, when applicable, decrypted) submission.
#[derive(Debug)]
pub struct Submission {
    path: PathBuf,
    working_dir: WorkingDir,
    root: XmlElement,
    meta: SubmissionMetaData,
    key: String,
    validation: ValidationStatus,
}

impl Submission {
    /// `KEY` cell value: the instance id, or a synthesized `uuid:` key
    /// when the document carries none.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The directory holding this submission's `submission.xml`.
    pub fn instance_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    /// Where decrypted (or source) files are readable.
    pub fn working_dir(&self) -> &Path {
        self.working_dir.path()
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn meta(&self) -> &SubmissionMetaData {
        &self.meta
    }

    pub fn submission_date(&self) -> Option<DateTime<FixedOffset>> {
        self.meta.submission_date()
    }

    pub fn validation(&self) -> ValidationStatus {
        self.validation
    }
}

/// Reads just enough of a submission to learn its date, caching the parsed
/// document for the later full parse.
pub fn read_submission_date(
    path: &Path,
    cache: &ParseCache,
) -> Option<DateTime<FixedOffset>> {
    let document = match xml::parse_file(path) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Can't parse submission");
            return None;
        }
    };
    let date = SubmissionMetaData::from_root(&document).submission_date();
    cache.put(path, document);
    date
}

/// Parses one submission, decrypting and validating it when the form is
/// encrypted. Returns `None` for every per-submission failure (the caller
/// counts it as skipped); the reasons are logged.
pub fn parse_submission(
    path: &Path,
    is_encrypted: bool,
    private_key: Option<&RsaPrivateKey>,
    cache: &ParseCache,
) -> Option<Submission> {
    let document = match cache.take(path) {
        Some(doc) => doc,
        None => {
            tracing::debug!(path = %path.display(), "Parse cache miss");
            match xml::parse_file(path) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Can't parse submission");
                    return None;
                }
            }
        }
    };

    let meta = SubmissionMetaData::from_root(&document);
    let key = meta
        .instance_id()
        .map(str::to_string)
        .unwrap_or_else(|| format!("uuid:{}", Uuid::new_v4()));

    if !is_encrypted {
        return Some(Submission {
            working_dir: WorkingDir::Source(path.parent()?.to_path_buf()),
            path: path.to_path_buf(),
            root: document,
            meta,
            key,
            validation: ValidationStatus::NotValidated,
        });
    }

    let private_key = private_key?;
    decrypt_submission(path, meta, key, private_key)
        .map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Skipping submission");
        })
        .ok()
}

fn decrypt_submission(
    path: &Path,
    meta: SubmissionMetaData,
    key: String,
    private_key: &RsaPrivateKey,
) -> Result<Submission, crate::domain::SatchelError> {
    let instance_dir = path
        .parent()
        .ok_or_else(|| crate::domain::SatchelError::Io("submission has no parent dir".into()))?;

    let instance_id = meta
        .instance_id()
        .ok_or(CryptoError::KeyUnwrap("missing instance id".to_string()))?
        .to_string();
    let base64_key = meta
        .base64_encrypted_key()
        .ok_or(CryptoError::KeyUnwrap("missing encrypted key".to_string()))?
        .to_string();

    let mut factory = CipherFactory::new(&instance_id, &base64_key, private_key)?;

    // The signature decrypts independently of the file ciphers
    let signature = match meta.encrypted_signature() {
        Some(encrypted) => Some(decrypt_signature(private_key, encrypted)?),
        None => None,
    };

    // Every declared media file must be present before anything decrypts
    let media_paths: Vec<PathBuf> = meta
        .media_names()
        .iter()
        .map(|name| instance_dir.join(name))
        .collect();
    for (name, media_path) in meta.media_names().iter().zip(&media_paths) {
        if !media_path.is_file() {
            return Err(CryptoError::MissingMedia { name: name.clone() }.into());
        }
    }

    let working_dir = TempDir::new()?;

    // Fixed cipher order: declared media first, the payload last
    let mut decrypted_files = Vec::with_capacity(media_paths.len() + 1);
    for media_path in &media_paths {
        let decryptor = factory.next_decryptor()?;
        decrypted_files.push(decrypt_file(media_path, working_dir.path(), decryptor)?);
    }

    let payload_name = meta.encrypted_xml_file().unwrap_or("submission.xml.enc");
    let payload_path = instance_dir.join(payload_name);
    if !payload_path.is_file() {
        return Err(CryptoError::MissingMedia {
            name: payload_name.to_string(),
        }
        .into());
    }
    let decryptor = factory.next_decryptor()?;
    let decrypted_payload = decrypt_file(&payload_path, working_dir.path(), decryptor)?;
    decrypted_files.push(decrypted_payload.clone());

    let decrypted_root = xml::parse_file(&decrypted_payload)?;

    let validation = match signature {
        Some(expected) => {
            let input = build_signature_input(
                meta.form_id().unwrap_or_default(),
                meta.version(),
                &base64_key,
                &instance_id,
                &decrypted_files,
            )?;
            let digest = compute_digest(&input);
            let status = ValidationStatus::of(digest.as_slice() == expected.as_slice());
            if status == ValidationStatus::NotValid {
                tracing::warn!(
                    instance_id = %instance_id,
                    "Signature mismatch, submission marked as not valid"
                );
            }
            status
        }
        None => ValidationStatus::NotValidated,
    };

    Ok(Submission {
        path: path.to_path_buf(),
        working_dir: WorkingDir::Temp(working_dir),
        root: decrypted_root,
        meta,
        key,
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::xml::parse_str;

    const ENVELOPE: &str = r#"
        <data id="enc-form" version="2" encrypted="yes"
              instanceID="uuid:att" submissionDate="2020-03-04T10:20:30.000Z">
          <base64EncryptedKey>S0VZ</base64EncryptedKey>
          <media><file>photo.jpg.enc</file></media>
          <media><file>sound.mp3.enc</file></media>
          <encryptedXmlFile>submission.xml.enc</encryptedXmlFile>
          <base64EncryptedElementSignature>U0lH</base64EncryptedElementSignature>
          <meta><instanceID>uuid:123</instanceID></meta>
        </data>"#;

    #[test]
    fn test_metadata_from_envelope() {
        let root = parse_str(ENVELOPE).unwrap();
        let meta = SubmissionMetaData::from_root(&root);

        assert_eq!(meta.instance_id(), Some("uuid:123"));
        assert_eq!(meta.form_id(), Some("enc-form"));
        assert_eq!(meta.version(), Some("2"));
        assert_eq!(meta.base64_encrypted_key(), Some("S0VZ"));
        assert_eq!(meta.encrypted_signature(), Some("U0lH"));
        assert_eq!(meta.media_names(), ["photo.jpg.enc", "sound.mp3.enc"]);
        assert_eq!(meta.encrypted_xml_file(), Some("submission.xml.enc"));
        assert_eq!(
            meta.submission_date().unwrap().to_rfc3339(),
            "2020-03-04T10:20:30+00:00"
        );
    }

    #[test]
    fn test_instance_id_element_beats_attribute() {
        let root = parse_str(ENVELOPE).unwrap();
        let meta = SubmissionMetaData::from_root(&root);
        // The element inside meta wins over the root attribute
        assert_eq!(meta.instance_id(), Some("uuid:123"));
    }

    #[test]
    fn test_instance_id_attribute_fallback() {
        let root = parse_str(r#"<data instanceID="uuid:attr-only"><x>1</x></data>"#).unwrap();
        let meta = SubmissionMetaData::from_root(&root);
        assert_eq!(meta.instance_id(), Some("uuid:attr-only"));
    }

    #[test]
    fn test_parse_submission_date_formats() {
        assert!(parse_submission_date("2020-01-02T03:04:05.678Z").is_some());
        assert!(parse_submission_date("2020-01-02T03:04:05+02:00").is_some());
        assert!(parse_submission_date("2020-01-02T03:04:05.678+0200").is_some());
        assert!(parse_submission_date("yesterday").is_none());
    }

    #[test]
    fn test_validation_status_cells() {
        assert_eq!(ValidationStatus::Valid.as_cell(), "True");
        assert_eq!(ValidationStatus::NotValid.as_cell(), "False");
        assert_eq!(ValidationStatus::NotValidated.as_cell(), "False");
    }
}
