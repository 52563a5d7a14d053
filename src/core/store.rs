//! Submission store: the on-disk instance layout
//!
//! A form directory keeps one subdirectory per submission under
//! `instances/`, each holding a `submission.xml` plus any media or
//! encrypted payload files. The store is stateless and does no I/O beyond
//! directory listing.

use std::fs;
use std::path::{Path, PathBuf};

/// Whether `path` is a submission instance directory.
pub fn is_instance_dir(path: &Path) -> bool {
    path.is_dir() && path.join("submission.xml").is_file()
}

/// Direct subdirectories of `form_dir/instances` that contain a readable
/// `submission.xml`, sorted by path for deterministic enumeration.
///
/// A missing or unreadable `instances/` directory yields an empty list,
/// not an error.
pub fn list_instances(form_dir: &Path) -> Vec<PathBuf> {
    let instances_dir = form_dir.join("instances");
    let entries = match fs::read_dir(&instances_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_instance_dir(path))
        .collect();
    dirs.sort();
    dirs
}
