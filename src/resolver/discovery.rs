use super::file_classifier::{FileCategory, FileClassifier};
use crate::error::CourtError;
use log::{debug, warn};
use std::fs;
use std::path::{Component, Path};
use walkdir::WalkDir;

/// Directory (relative to the repository root) holding quarantined files.
pub const QUARANTINE_DIR: &str = "quarantine";

/// A discovered, analyzable file with its content cached for the run.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Repository-relative, `/`-separated.
    pub path: String,
    pub category: FileCategory,
    pub extension: String,
    pub size: u64,
    /// `None` when the file could not be read as text.
    pub content: Option<String>,
}

impl SourceFile {
    pub fn from_content(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        Self {
            category: FileClassifier::categorize(&path),
            extension: FileClassifier::extension(&path),
            size: content.len() as u64,
            content: Some(content),
            path,
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Parent directory, `""` at the repository root.
    pub fn parent(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

/// Convert a path under `root` into the repository-relative form used
/// throughout the crate.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Walk the repository and load every analyzable, unprotected file.
/// Results are sorted by path so every downstream stage is deterministic.
pub fn discover_files(root: &Path, classifier: &FileClassifier) -> Vec<SourceFile> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if entry.depth() == 1 && name == QUARANTINE_DIR {
                return false;
            }
            !FileClassifier::is_skipped_dir(&name)
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match relative_path(root, entry.path()) {
            Some(rel) => rel,
            None => continue,
        };
        if !FileClassifier::is_analyzable(&rel) || classifier.is_protected(&rel) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let content = match fs::read(entry.path()) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(source) => {
                let err = CourtError::FileRead {
                    path: entry.path().to_path_buf(),
                    source,
                };
                warn!("{}", err);
                None
            }
        };

        files.push(SourceFile {
            category: FileClassifier::categorize(&rel),
            extension: FileClassifier::extension(&rel),
            path: rel,
            size,
            content,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Discovered {} analyzable files under {}", files.len(), root.display());
    files
}
