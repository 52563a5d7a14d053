//! Buffered CSV output files
//!
//! Each output file is opened once per export. With overwrite enabled the
//! file is truncated and a fresh header written; otherwise new rows are
//! appended after the existing content without repeating the header.
//! Output is UTF-8, `\n`-terminated, no BOM.

use crate::domain::result::Result;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One open CSV output file.
#[derive(Debug)]
pub struct CsvTarget {
    path: PathBuf,
    writer: BufWriter<std::fs::File>,
}

impl CsvTarget {
    /// Opens `path` according to the overwrite policy, writing `header`
    /// only when starting a fresh file.
    pub fn open(path: &Path, overwrite: bool, header: &str) -> Result<Self> {
        if path.exists() && !overwrite {
            let file = OpenOptions::new().append(true).open(path)?;
            return Ok(Self {
                path: path.to_path_buf(),
                writer: BufWriter::new(file),
            });
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut target = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        target.append(header)?;
        Ok(target)
    }

    /// Appends pre-terminated CSV lines.
    pub fn append(&mut self, lines: &str) -> Result<()> {
        self.writer.write_all(lines.as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
