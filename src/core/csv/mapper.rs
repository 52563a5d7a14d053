//! Pure mapping from model + parsed submission to CSV text
//!
//! Headers and rows are deterministic functions of the form model and the
//! submission document. Groups are inlined with dash-joined names,
//! geopoints split into four columns, and repeat groups emit a single
//! `SET-OF-<name>` placeholder column whose rows live in the repeat's own
//! CSV file, keyed back to their parent row.

use crate::core::crypto::md5_base64;
use crate::core::submission::Submission;
use crate::core::xml::XmlElement;
use crate::domain::model::{DataType, Model, NodeId, NodeKind};
use crate::domain::result::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use std::fs;
use std::path::{Path, PathBuf};

/// Media export settings for row generation.
#[derive(Debug, Clone)]
pub struct MediaOptions {
    pub export_media: bool,
    pub media_dir: PathBuf,
}

impl MediaOptions {
    pub fn disabled() -> Self {
        Self {
            export_media: false,
            media_dir: PathBuf::new(),
        }
    }
}

/// One output column: header text plus how to obtain its cell.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    header: String,
    source: ColumnSource,
}

impl ColumnSpec {
    pub fn header(&self) -> &str {
        &self.header
    }
}

#[derive(Debug, Clone)]
enum ColumnSource {
    Value {
        path: Vec<String>,
        data_type: DataType,
    },
    GeoComponent {
        path: Vec<String>,
        component: usize,
    },
    SetOf {
        name: String,
    },
}

const GEO_COMPONENTS: [&str; 4] = ["Latitude", "Longitude", "Altitude", "Accuracy"];

/// Ordered column list for rows scoped at `scope` (the instance root for
/// the main file, a repeat node for repeat files).
pub fn flatten_columns(model: &Model, scope: NodeId) -> Vec<ColumnSpec> {
    let mut columns = Vec::new();
    flatten_into(model, scope, "", &[], &mut columns);
    columns
}

fn flatten_into(
    model: &Model,
    scope: NodeId,
    prefix: &str,
    path: &[String],
    out: &mut Vec<ColumnSpec>,
) {
    for child_id in model.children_of(scope) {
        let child = model.node(child_id);
        let header = if prefix.is_empty() {
            child.name().to_string()
        } else {
            format!("{prefix}-{}", child.name())
        };
        let mut child_path = path.to_vec();
        child_path.push(child.name().to_string());
        match child.kind() {
            NodeKind::Repeat => out.push(ColumnSpec {
                header: format!("SET-OF-{}", child.name()),
                source: ColumnSource::SetOf {
                    name: child.name().to_string(),
                },
            }),
            NodeKind::Group => flatten_into(model, child_id, &header, &child_path, out),
            NodeKind::Field(DataType::Geopoint) => {
                for (component, suffix) in GEO_COMPONENTS.iter().enumerate() {
                    out.push(ColumnSpec {
                        header: format!("{header}-{suffix}"),
                        source: ColumnSource::GeoComponent {
                            path: child_path.clone(),
                            component,
                        },
                    });
                }
            }
            NodeKind::Field(data_type) => out.push(ColumnSpec {
                header,
                source: ColumnSource::Value {
                    path: child_path,
                    data_type,
                },
            }),
        }
    }
}

/// Header line of the main CSV file.
pub fn main_header(model: &Model, is_encrypted: bool) -> String {
    let mut cells = vec!["SubmissionDate".to_string()];
    cells.extend(
        flatten_columns(model, model.root())
            .iter()
            .map(|c| encode_cell(c.header())),
    );
    cells.push("KEY".to_string());
    if is_encrypted {
        cells.push("isValidated".to_string());
    }
    format!("{}\n", cells.join(","))
}

/// Header line of a repeat group's CSV file.
pub fn repeat_header(model: &Model, repeat: NodeId) -> String {
    let name = model.node(repeat).name();
    let mut cells = vec![
        "PARENT_KEY".to_string(),
        "KEY".to_string(),
        format!("SET-OF-{name}"),
    ];
    cells.extend(
        flatten_columns(model, repeat)
            .iter()
            .map(|c| encode_cell(c.header())),
    );
    format!("{}\n", cells.join(","))
}

/// The single main-file row of one submission.
pub fn main_submission_row(
    model: &Model,
    submission: &Submission,
    is_encrypted: bool,
    media: &MediaOptions,
) -> Result<String> {
    let mut cells = Vec::new();
    cells.push(
        submission
            .submission_date()
            .map(format_datetime)
            .unwrap_or_default(),
    );
    for column in flatten_columns(model, model.root()) {
        cells.push(render_cell(
            &column,
            submission.root(),
            submission.key(),
            submission.working_dir(),
            media,
        )?);
    }
    cells.push(encode_cell(submission.key()));
    if is_encrypted {
        cells.push(submission.validation().as_cell().to_string());
    }
    Ok(format!("{}\n", cells.join(",")))
}

/// All rows one submission contributes to a repeat group's CSV file, in
/// document order. Empty when the submission has no entries.
pub fn repeat_rows(
    model: &Model,
    repeat: NodeId,
    submission: &Submission,
    media: &MediaOptions,
) -> Result<String> {
    let chain = model.path_from_root(repeat);
    if chain.is_empty() {
        return Ok(String::new());
    }
    let mut instances = Vec::new();
    collect_instances(
        model,
        &chain,
        0,
        submission.root(),
        submission.key(),
        &mut instances,
    );

    let columns = flatten_columns(model, repeat);
    let mut lines = String::new();
    for instance in instances {
        let mut cells = vec![
            encode_cell(&instance.parent_key),
            encode_cell(&instance.key),
            encode_cell(&instance.set),
        ];
        for column in &columns {
            cells.push(render_cell(
                column,
                instance.element,
                &instance.key,
                submission.working_dir(),
                media,
            )?);
        }
        lines.push_str(&cells.join(","));
        lines.push('\n');
    }
    Ok(lines)
}

struct RepeatInstance<'a> {
    parent_key: String,
    set: String,
    key: String,
    element: &'a XmlElement,
}

fn collect_instances<'a>(
    model: &'a Model,
    chain: &[NodeId],
    idx: usize,
    element: &'a XmlElement,
    key: &str,
    out: &mut Vec<RepeatInstance<'a>>,
) {
    let node = model.node(chain[idx]);
    let name = node.name();
    if idx == chain.len() - 1 {
        let set = format!("{key}/{name}");
        for (n, child) in element.children_named(name).enumerate() {
            out.push(RepeatInstance {
                parent_key: key.to_string(),
                set: set.clone(),
                key: format!("{set}[{}]", n + 1),
                element: child,
            });
        }
    } else if node.is_repeat() {
        let set = format!("{key}/{name}");
        for (n, child) in element.children_named(name).enumerate() {
            let child_key = format!("{set}[{}]", n + 1);
            collect_instances(model, chain, idx + 1, child, &child_key, out);
        }
    } else if let Some(child) = element.child(name) {
        collect_instances(model, chain, idx + 1, child, key, out);
    }
}

fn render_cell(
    column: &ColumnSpec,
    scope: &XmlElement,
    row_key: &str,
    working_dir: &Path,
    media: &MediaOptions,
) -> Result<String> {
    match &column.source {
        ColumnSource::SetOf { name } => Ok(encode_cell(&format!("{row_key}/{name}"))),
        ColumnSource::GeoComponent { path, component } => Ok(lookup(scope, path)
            .and_then(|value| value.split_whitespace().nth(*component))
            .map(encode_cell)
            .unwrap_or_default()),
        ColumnSource::Value { path, data_type } => match lookup(scope, path) {
            None => Ok(String::new()),
            Some(raw) => format_cell(raw, *data_type, working_dir, media),
        },
    }
}

fn lookup<'a>(scope: &'a XmlElement, path: &[String]) -> Option<&'a str> {
    let mut cursor = scope;
    for segment in path {
        cursor = cursor.child(segment)?;
    }
    cursor.value()
}

fn format_cell(
    raw: &str,
    data_type: DataType,
    working_dir: &Path,
    media: &MediaOptions,
) -> Result<String> {
    let cell = match data_type {
        DataType::Date => format_date(raw),
        DataType::Time => format_time(raw),
        DataType::DateTime => format_datetime_text(raw),
        DataType::Boolean => format_boolean(raw),
        DataType::Binary => return export_binary(raw, working_dir, media),
        _ => raw.to_string(),
    };
    Ok(encode_cell(&cell))
}

/// RFC 4180 escaping: quote only when the value needs it, double embedded
/// quotes, keep embedded newlines inside the quotes.
pub fn encode_cell(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_date(raw: &str) -> String {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

fn format_time(raw: &str) -> String {
    match NaiveTime::parse_from_str(raw, "%H:%M:%S%.f") {
        Ok(time) => time.format("%H:%M:%S%.3f").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn format_datetime_text(raw: &str) -> String {
    match crate::core::submission::parse_submission_date(raw) {
        Some(dt) => format_datetime(dt),
        None => raw.to_string(),
    }
}

/// ISO-8601 with millisecond precision; a zero offset renders as `Z`.
pub fn format_datetime(dt: DateTime<FixedOffset>) -> String {
    let base = dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
    if dt.offset().local_minus_utc() == 0 {
        format!("{base}Z")
    } else {
        format!("{base}{}", dt.format("%:z"))
    }
}

/// Java `Boolean.parseBoolean` semantics: only a case-insensitive "true"
/// is true. Empty values never reach this function.
fn format_boolean(raw: &str) -> String {
    if raw.eq_ignore_ascii_case("true") {
        "True".to_string()
    } else {
        "False".to_string()
    }
}

fn export_binary(file_name: &str, working_dir: &Path, media: &MediaOptions) -> Result<String> {
    if !media.export_media {
        return Ok(encode_cell(file_name));
    }
    let source = working_dir.join(file_name);
    if !source.is_file() {
        tracing::warn!(file = %source.display(), "Referenced media file not found, not copied");
        return Ok(encode_cell(file_name));
    }
    let final_name = copy_media(&source, &media.media_dir, file_name)?;
    Ok(encode_cell(&final_name))
}

/// Copies a media file into the media directory. Collisions get `-2`,
/// `-3`, … suffixes before the extension; an existing file with identical
/// contents is reused so repeated exports stay deterministic.
fn copy_media(source: &Path, media_dir: &Path, name: &str) -> Result<String> {
    fs::create_dir_all(media_dir)?;
    let mut candidate = name.to_string();
    let mut sequence = 2;
    loop {
        let destination = media_dir.join(&candidate);
        if !destination.exists() {
            fs::copy(source, &destination)?;
            return Ok(candidate);
        }
        if md5_base64(source)? == md5_base64(&destination)? {
            return Ok(candidate);
        }
        candidate = numbered_name(name, sequence);
        sequence += 1;
    }
}

fn numbered_name(name: &str, sequence: usize) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => format!("{}-{}{}", &name[..idx], sequence, &name[idx..]),
        _ => format!("{name}-{sequence}"),
    }
}
