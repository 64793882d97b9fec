//! CSV source tables from the legacy export.
//!
//! A [`SourceTable`] checks its header against the columns a pass needs
//! before any row is read, so a missing column fails the run up front
//! instead of halfway through a pass.

use indexmap::IndexMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{MigrationError, Result};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// One CSV record keyed by header name, in header order.
///
/// Cells missing from a short record are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    file: Rc<str>,
    line: u64,
    values: IndexMap<String, Option<String>>,
}

impl SourceRow {
    /// Build a row from header/value pairs
    pub fn from_pairs(file: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            file: Rc::from(file),
            line: 0,
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                .collect(),
        }
    }

    /// Raw cell for `column`; `Ok(None)` if this record is too short to
    /// have it, an error if the file has no such column at all.
    pub fn get(&self, column: &str) -> Result<Option<&str>> {
        match self.values.get(column) {
            Some(value) => Ok(value.as_deref()),
            None => Err(MigrationError::MissingColumn {
                file: self.file.to_string(),
                column: column.to_string(),
            }),
        }
    }

    /// Raw cell for a key column, with absent cells read as empty.
    pub fn key(&self, column: &str) -> Result<&str> {
        Ok(self.get(column)?.unwrap_or_default())
    }

    /// Line number in the source file (0 for rows not read from a file)
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn file(&self) -> &str {
        &self.file
    }
}

/// A legacy CSV export opened for one pass
pub struct SourceTable<R: Read = File> {
    path: PathBuf,
    file: Rc<str>,
    headers: Vec<String>,
    reader: csv::Reader<R>,
}

impl SourceTable<File> {
    /// Open `path` and check that its header has every `required` column.
    pub fn open<P: AsRef<Path>>(path: P, required: &[&str]) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MigrationError::SourceMissing {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|source| MigrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_path(path.to_path_buf(), file, required)
    }
}

impl<R: Read> SourceTable<R> {
    /// Read a source from any reader; `name` stands in for the file path.
    pub fn from_reader(name: &str, reader: R, required: &[&str]) -> Result<Self> {
        Self::with_path(PathBuf::from(name), reader, required)
    }

    fn with_path(path: PathBuf, reader: R, required: &[&str]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| MigrationError::Csv {
                path: path.clone(),
                source,
            })?
            .iter()
            .map(|h| h.trim_start_matches(BYTE_ORDER_MARK).to_string())
            .collect();

        let file: Rc<str> = Rc::from(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        );

        if let Some(column) = required.iter().find(|c| !headers.iter().any(|h| h == *c)) {
            return Err(MigrationError::MissingColumn {
                file: file.to_string(),
                column: column.to_string(),
            });
        }

        Ok(Self {
            path,
            file,
            headers,
            reader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file
    }

    /// Header names with any byte-order mark removed
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Iterate the remaining records in file order.
    pub fn rows(&mut self) -> impl Iterator<Item = Result<SourceRow>> + '_ {
        let Self {
            path,
            file,
            headers,
            reader,
        } = self;

        reader.records().map(move |record| {
            let record = record.map_err(|source| MigrationError::Csv {
                path: path.clone(),
                source,
            })?;

            let values = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), record.get(i).map(str::to_string)))
                .collect();

            Ok(SourceRow {
                file: Rc::clone(file),
                line: record.position().map_or(0, |p| p.line()),
                values,
            })
        })
    }
}
