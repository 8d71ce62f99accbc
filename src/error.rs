use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the analysis pipeline and the quarantine store.
///
/// Only `Configuration` is fatal to a run. The other variants are raised
/// at the per-file level and are logged and skipped by their callers.
#[derive(Error, Debug)]
pub enum CourtError {
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("quarantine manifest at {path} is corrupt: {reason}")]
    ManifestCorruption { path: PathBuf, reason: String },

    #[error("quarantine I/O failed for {path}: {source}")]
    QuarantineIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CourtError {
    pub fn parse(path: impl Into<String>, reason: impl ToString) -> Self {
        CourtError::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CourtError>;
