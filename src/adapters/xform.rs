//! XForms form-definition loader
//!
//! Reads just enough of a form's XForms document to drive an export: the
//! primary instance tree (structure and names), the `<bind>` types, which
//! nodesets are repeats, and whether submissions are encrypted. This is
//! deliberately not an XForms engine; calculations, relevance and choice
//! lists play no role in flattening submissions.

use crate::core::xml::{self, XmlElement};
use crate::domain::errors::SatchelError;
use crate::domain::form::FormDefinition;
use crate::domain::model::{DataType, Model, ModelBuilder};
use crate::domain::result::Result;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads the form definition from `form_dir`.
///
/// `form_file` picks the definition file explicitly; otherwise the single
/// `.xml` file directly inside `form_dir` is used.
pub fn load_form_definition(
    form_dir: &Path,
    form_file: Option<&Path>,
) -> Result<FormDefinition> {
    let path = match form_file {
        Some(file) if file.is_absolute() => file.to_path_buf(),
        Some(file) => form_dir.join(file),
        None => discover_form_file(form_dir)?,
    };
    let document = xml::parse_file(&path)?;

    let form_name = document
        .find_first("title")
        .and_then(|t| t.value())
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .ok_or_else(|| SatchelError::Parse {
            path: path.clone(),
            reason: "form has no usable name".to_string(),
        })?;

    let model_element = document
        .find_first("model")
        .ok_or_else(|| SatchelError::Parse {
            path: path.clone(),
            reason: "form has no model element".to_string(),
        })?;
    let instance_root = model_element
        .child("instance")
        .and_then(|i| i.children().first())
        .ok_or_else(|| SatchelError::Parse {
            path: path.clone(),
            reason: "form has no primary instance".to_string(),
        })?;

    let form_id = instance_root
        .attribute("id")
        .filter(|v| !v.is_empty())
        .unwrap_or(instance_root.name())
        .to_string();
    let form_version = instance_root
        .attribute("version")
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let binds = collect_binds(model_element);
    let repeats = collect_repeat_nodesets(&document);
    let is_encrypted = model_element
        .find_first("submission")
        .map(|s| s.attribute("base64RsaPublicKey").is_some())
        .unwrap_or(false);

    let mut builder = Model::builder(instance_root.name());
    let root_path = format!("/{}", instance_root.name());
    for child in instance_root.children() {
        build_node(&mut builder, child, &root_path, &binds, &repeats);
    }

    Ok(FormDefinition::new(
        form_id,
        form_name,
        form_version,
        is_encrypted,
        form_dir,
        builder.build(),
    ))
}

fn discover_form_file(form_dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(form_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "xml"))
        .collect();
    candidates.sort();
    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(SatchelError::Configuration(format!(
            "no form definition file in {}",
            form_dir.display()
        ))),
        _ => Err(SatchelError::Configuration(format!(
            "multiple .xml files in {}, set form_file to pick one",
            form_dir.display()
        ))),
    }
}

/// nodeset → bind type, absolute paths as written in the form.
fn collect_binds(model_element: &XmlElement) -> HashMap<String, String> {
    model_element
        .children_named("bind")
        .filter_map(|bind| {
            let nodeset = bind.attribute("nodeset")?;
            let bind_type = bind.attribute("type").unwrap_or("string");
            Some((nodeset.to_string(), bind_type.to_string()))
        })
        .collect()
}

/// Every nodeset the body declares as a repeat.
fn collect_repeat_nodesets(document: &XmlElement) -> HashSet<String> {
    let mut nodesets = HashSet::new();
    collect_repeats_into(document, &mut nodesets);
    nodesets
}

fn collect_repeats_into(element: &XmlElement, out: &mut HashSet<String>) {
    if element.name() == "repeat" {
        if let Some(nodeset) = element.attribute("nodeset").or(element.attribute("ref")) {
            out.insert(nodeset.to_string());
        }
    }
    for child in element.children() {
        collect_repeats_into(child, out);
    }
}

fn build_node(
    builder: &mut ModelBuilder,
    element: &XmlElement,
    parent_path: &str,
    binds: &HashMap<String, String>,
    repeats: &HashSet<String>,
) {
    let path = format!("{parent_path}/{}", element.name());
    if element.children().is_empty() {
        let data_type = binds
            .get(&path)
            .map(|t| DataType::from_xform(t))
            .unwrap_or(DataType::Text);
        builder.field(element.name(), data_type);
        return;
    }
    if repeats.contains(&path) {
        builder.start_repeat(element.name());
    } else {
        builder.start_group(element.name());
    }
    for child in element.children() {
        build_node(builder, child, &path, binds, repeats);
    }
    builder.end_group();
}
