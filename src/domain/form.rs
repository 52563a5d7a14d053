//! Form definition consumed by the export core

use super::model::Model;
use std::path::{Path, PathBuf};

/// A loaded form definition: identity, encryption flag, on-disk location
/// and the schema [`Model`]. Produced by the form-definition loader and
/// consumed read-only by the export pipeline.
#[derive(Debug, Clone)]
pub struct FormDefinition {
    form_id: String,
    form_name: String,
    form_version: Option<String>,
    is_encrypted: bool,
    form_dir: PathBuf,
    model: Model,
}

impl FormDefinition {
    pub fn new(
        form_id: impl Into<String>,
        form_name: impl Into<String>,
        form_version: Option<String>,
        is_encrypted: bool,
        form_dir: impl Into<PathBuf>,
        model: Model,
    ) -> Self {
        Self {
            form_id: form_id.into(),
            form_name: form_name.into(),
            form_version,
            is_encrypted,
            form_dir: form_dir.into(),
            model,
        }
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    pub fn form_version(&self) -> Option<&str> {
        self.form_version.as_deref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.is_encrypted
    }

    pub fn form_dir(&self) -> &Path {
        &self.form_dir
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Form name reduced to characters safe for output file names.
    /// Anything outside `[A-Za-z0-9._-]` becomes an underscore.
    pub fn safe_base_name(&self) -> String {
        self.form_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DataType, Model};

    fn minimal_form(name: &str) -> FormDefinition {
        let mut b = Model::builder("data");
        b.field("name", DataType::Text);
        FormDefinition::new("form-1", name, None, false, "/tmp/form", b.build())
    }

    #[test]
    fn test_safe_base_name_strips_illegal_chars() {
        assert_eq!(
            minimal_form("Household survey (v2)").safe_base_name(),
            "Household_survey__v2_"
        );
        assert_eq!(minimal_form("plain-name_1.0").safe_base_name(), "plain-name_1.0");
    }

    #[test]
    fn test_accessors() {
        let form = minimal_form("simple");
        assert_eq!(form.form_id(), "form-1");
        assert!(!form.is_encrypted());
        assert!(form.form_version().is_none());
    }
}
