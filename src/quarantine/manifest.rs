use crate::error::{CourtError, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "quarantine_manifest.json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Local time in ISO-8601 without offset, microsecond precision.
pub fn now_timestamp() -> String {
    Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts timestamps with or without fractional seconds or an offset.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub timestamp: String,
    pub files_count: usize,
    pub files: Vec<String>,
}

/// One quarantined file. `restored` and `deleted` are terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default)]
    pub original_path: String,
    pub quarantine_path: String,
    pub session_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub restored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub cleaned: bool,
    /// Fields written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FileRecord {
    pub fn is_active(&self) -> bool {
        !self.restored && !self.deleted
    }

    pub fn status(&self) -> &'static str {
        if self.restored {
            "restored"
        } else if self.deleted {
            "deleted"
        } else if self.cleaned {
            "cleaned"
        } else {
            "pending"
        }
    }
}

/// Durable record of every quarantine session and file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineManifest {
    pub created: String,
    pub last_updated: String,
    #[serde(default)]
    pub quarantine_sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
}

impl Default for QuarantineManifest {
    fn default() -> Self {
        let now = now_timestamp();
        Self {
            created: now.clone(),
            last_updated: now,
            quarantine_sessions: Vec::new(),
            files: BTreeMap::new(),
        }
    }
}

impl QuarantineManifest {
    /// Load from disk. A missing file yields a fresh manifest; a corrupt one
    /// is reported and replaced by a fresh manifest.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::read(path) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!("{}; starting a fresh manifest, quarantine history lost", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CourtError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| CourtError::ManifestCorruption {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Stamp `last_updated` and rewrite the whole manifest. The content goes
    /// to a sibling temp file first and is renamed over the target.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_updated = now_timestamp();
        let io_error = |source| CourtError::QuarantineIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| CourtError::ManifestCorruption {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_error)?;
        if let Err(e) = fs::rename(&tmp, path) {
            warn!("Could not replace {}: {}", path.display(), e);
            let _ = fs::remove_file(&tmp);
            return Err(io_error(e));
        }
        Ok(())
    }

    pub fn session(&self, session_id: &str) -> Option<&SessionRecord> {
        self.quarantine_sessions
            .iter()
            .find(|s| s.session_id == session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_manifest_is_fresh() {
        let dir = TempDir::new().unwrap();
        let manifest = QuarantineManifest::load(&dir.path().join(MANIFEST_FILE));
        assert!(manifest.files.is_empty());
        assert!(manifest.quarantine_sessions.is_empty());
    }

    #[test]
    fn test_corrupt_manifest_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "{ not json").unwrap();
        let manifest = QuarantineManifest::load(&path);
        assert!(manifest.files.is_empty());
    }

    #[test]
    fn test_external_fields_survive_a_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(
            &path,
            r#"{
  "created": "2024-01-01T10:00:00.000000",
  "last_updated": "2024-01-01T10:00:00.000000",
  "quarantine_sessions": [
    {"session_id": "s1", "timestamp": "2024-01-01T10:00:00", "files_count": 1, "files": ["a.py"]}
  ],
  "files": {
    "a.py": {
      "quarantine_path": "quarantine/s1/a.py",
      "session_id": "s1",
      "timestamp": "2024-01-01T10:00:00",
      "reasons": ["orphan"],
      "restored": false,
      "reviewer": "ops"
    }
  }
}"#,
        )
        .unwrap();

        let mut manifest = QuarantineManifest::load(&path);
        assert_eq!(manifest.files["a.py"].extra["reviewer"], "ops");
        manifest.save(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["files"]["a.py"]["reviewer"], "ops");
        assert!(raw["files"]["a.py"].get("deleted").is_none());
        assert_eq!(raw["quarantine_sessions"][0]["files_count"], 1);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-01-01T10:00:00.123456").is_some());
        assert!(parse_timestamp("2024-01-01T10:00:00").is_some());
        assert!(parse_timestamp("2024-01-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp(&now_timestamp()).is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
