//! Fatal errors that abort a migration run.
//!
//! Anything recoverable at row level (bad numbers, bad dates, dangling
//! references) is reported through [`crate::report`] instead.

use std::fmt;
use std::path::PathBuf;

/// Error type for migration runs
#[derive(Debug)]
pub enum MigrationError {
    SourceMissing {
        path: PathBuf,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
    MissingColumn {
        file: String,
        column: String,
    },
    Config {
        path: PathBuf,
        message: String,
    },
    Report(serde_json::Error),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::SourceMissing { path } => {
                write!(f, "Source file not found: {}", path.display())
            }
            MigrationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            MigrationError::Csv { path, source } => {
                write!(f, "Failed to read CSV {}: {}", path.display(), source)
            }
            MigrationError::MissingColumn { file, column } => {
                write!(f, "Column '{}' is missing from {}", column, file)
            }
            MigrationError::Config { path, message } => {
                write!(f, "Invalid configuration {}: {}", path.display(), message)
            }
            MigrationError::Report(e) => write!(f, "Failed to serialize report: {}", e),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Io { source, .. } => Some(source),
            MigrationError::Csv { source, .. } => Some(source),
            MigrationError::Report(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        MigrationError::Report(err)
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
