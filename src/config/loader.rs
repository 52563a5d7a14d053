//! Configuration loading
//!
//! Reads the TOML file, substitutes `${VAR}` environment references,
//! parses and validates it, and resolves the runtime pieces the pipeline
//! needs (date range, RSA private key).

use super::schema::SatchelConfig;
use crate::core::export::ExportConfiguration;
use crate::domain::daterange::DateRange;
use crate::domain::errors::SatchelError;
use crate::domain::result::Result;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use std::fs;
use std::path::Path;

/// Loads and validates the configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SatchelConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SatchelError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }
    let contents = fs::read_to_string(path).map_err(|e| {
        SatchelError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;
    let contents = substitute_env_vars(&contents)?;
    let config: SatchelConfig = toml::from_str(&contents)?;
    config.validate().map_err(SatchelError::Configuration)?;
    Ok(config)
}

/// Replaces every `${VAR}` occurrence with the environment value.
/// Undefined variables are an error: silently exporting with a missing
/// key path would fail much later and less clearly.
fn substitute_env_vars(contents: &str) -> Result<String> {
    let mut output = String::with_capacity(contents.len());
    let mut rest = contents;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            SatchelError::Configuration("unterminated ${...} reference".to_string())
        })?;
        let name = &after[..end];
        let value = std::env::var(name).map_err(|_| {
            SatchelError::Configuration(format!("environment variable {name} is not set"))
        })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Ok(output)
}

/// Loads an RSA private key from a PKCS#8/PKCS#1 PEM or PKCS#8 DER file.
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey> {
    let bytes = fs::read(path).map_err(|e| {
        SatchelError::Configuration(format!(
            "Failed to read private key {}: {e}",
            path.display()
        ))
    })?;
    let parsed = match std::str::from_utf8(&bytes) {
        Ok(pem) if pem.contains("-----BEGIN") => RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| e.to_string()),
        _ => RsaPrivateKey::from_pkcs8_der(&bytes).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| {
        SatchelError::Configuration(format!("Invalid private key {}: {e}", path.display()))
    })
}

/// Resolves the TOML settings into the runtime [`ExportConfiguration`].
pub fn runtime_configuration(config: &SatchelConfig) -> Result<ExportConfiguration> {
    let export = &config.export;
    let mut runtime = ExportConfiguration::new(&export.export_dir)
        .with_overwrite(export.overwrite_existing_files)
        .with_date_range(DateRange::new(export.start_date, export.end_date));
    if export.export_media {
        runtime = runtime.with_media_export(export.export_media_path.clone());
    }
    if let Some(key_path) = &export.private_key_file {
        runtime = runtime.with_private_key(load_private_key(key_path)?);
    }
    Ok(runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
                [form]
                form_dir = "/data/forms/simple"

                [export]
                export_dir = "/data/export"
                overwrite_existing_files = false
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(!config.export.overwrite_existing_files);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_config("/nonexistent/satchel.toml").unwrap_err();
        assert!(matches!(err, SatchelError::Configuration(_)));
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("SATCHEL_TEST_DIR", "/from-env");
        let out = substitute_env_vars("export_dir = \"${SATCHEL_TEST_DIR}/csv\"").unwrap();
        assert_eq!(out, "export_dir = \"/from-env/csv\"");
    }

    #[test]
    fn test_env_substitution_missing_var_fails() {
        let err = substitute_env_vars("key = \"${SATCHEL_TEST_UNDEFINED}\"").unwrap_err();
        assert!(matches!(err, SatchelError::Configuration(_)));
    }

    #[test]
    fn test_unterminated_reference_fails() {
        assert!(substitute_env_vars("key = \"${OOPS\"").is_err());
    }

    #[test]
    fn test_runtime_configuration_resolution() {
        let toml_str = r#"
            [form]
            form_dir = "/f"

            [export]
            export_dir = "/e"
            start_date = "2020-01-02"
            export_media = true
        "#;
        let config: SatchelConfig = toml::from_str(toml_str).unwrap();
        let runtime = runtime_configuration(&config).unwrap();

        assert!(runtime.export_media);
        assert!(runtime.private_key.is_none());
        assert_eq!(runtime.date_range.start(), Some("2020-01-02".parse().unwrap()));
        assert_eq!(runtime.media_dir(), std::path::PathBuf::from("/e/media"));
    }
}
