//! Shared fixtures for the integration suites
#![allow(dead_code)]

use satchel::domain::form::FormDefinition;
use satchel::domain::model::{DataType, Model};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes one instance directory with its `submission.xml`.
pub fn write_instance(form_dir: &Path, dir_name: &str, submission_xml: &str) -> PathBuf {
    let instance_dir = form_dir.join("instances").join(dir_name);
    fs::create_dir_all(&instance_dir).unwrap();
    fs::write(instance_dir.join("submission.xml"), submission_xml).unwrap();
    instance_dir
}

/// An unencrypted text form: a single `name` field.
pub fn simple_form(form_dir: &Path) -> FormDefinition {
    let mut b = Model::builder("data");
    b.field("name", DataType::Text);
    FormDefinition::new("simple", "simple", None, false, form_dir, b.build())
}

/// A submission for [`simple_form`].
pub fn simple_submission(instance_id: &str, date: &str, name: &str) -> String {
    format!(
        r#"<data id="simple" submissionDate="{date}">
             <name>{name}</name>
             <meta><instanceID>{instance_id}</instanceID></meta>
           </data>"#
    )
}

/// Splits CSV output into lines; the trailing newline must be present.
pub fn lines(content: &str) -> Vec<&str> {
    assert!(
        content.is_empty() || content.ends_with('\n'),
        "output must end with a newline"
    );
    content.lines().collect()
}

/// The value of `column` in a data line, by header position.
pub fn cell<'a>(header: &str, line: &'a str, column: &str) -> &'a str {
    let index = header
        .split(',')
        .position(|h| h == column)
        .unwrap_or_else(|| panic!("no column {column} in {header}"));
    line.split(',').nth(index).unwrap()
}
