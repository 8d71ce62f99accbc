use super::manifest::{now_timestamp, parse_timestamp, FileRecord, QuarantineManifest, SessionRecord, MANIFEST_FILE};
use super::restore_script::write_restore_script;
use crate::error::{CourtError, Result};
use crate::resolver::QUARANTINE_DIR;
use chrono::{Duration, Local, NaiveDateTime};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Why a single file could not be moved, restored or deleted.
#[derive(Error, Debug)]
pub enum QuarantineFailure {
    #[error("file not found")]
    NotFound,

    #[error("path must be relative and stay inside the repository")]
    InvalidPath,

    #[error("file not found in quarantine manifest")]
    NotInManifest,

    #[error("file already restored")]
    AlreadyRestored,

    #[error("file was permanently deleted")]
    Deleted,

    #[error("quarantined copy not found")]
    QuarantinedCopyMissing,

    #[error("a file already exists at the original path")]
    DestinationExists,

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error(transparent)]
    Io(#[from] CourtError),
}

/// Result of one per-file quarantine operation.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: String,
    pub quarantine_path: Option<String>,
    pub dry_run: bool,
    pub failure: Option<QuarantineFailure>,
}

impl FileOutcome {
    fn succeeded(path: &str, quarantine_path: Option<String>, dry_run: bool) -> Self {
        Self {
            path: path.to_string(),
            quarantine_path,
            dry_run,
            failure: None,
        }
    }

    fn failed(path: &str, failure: QuarantineFailure) -> Self {
        Self {
            path: path.to_string(),
            quarantine_path: None,
            dry_run: false,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuarantineSummary {
    pub total_quarantined: usize,
    pub restored: usize,
    pub deleted: usize,
    pub pending: usize,
    pub sessions: usize,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub sessions_cleaned: usize,
    pub cutoff_date: String,
}

/// Reject absolute paths, parent components and the quarantine tree itself.
pub fn validate_relative(path: &str) -> std::result::Result<PathBuf, QuarantineFailure> {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        return Err(QuarantineFailure::InvalidPath);
    }
    let components: Vec<Component> = candidate
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();
    if components.is_empty() || !components.iter().all(|c| matches!(c, Component::Normal(_))) {
        return Err(QuarantineFailure::InvalidPath);
    }
    if components[0] == Component::Normal(OsStr::new(QUARANTINE_DIR)) {
        return Err(QuarantineFailure::InvalidPath);
    }
    Ok(components.iter().collect())
}

/// Rename, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("rename {} failed ({}); copying instead", from.display(), e);
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

/// Reversible quarantine store rooted at `<repo>/quarantine/`.
///
/// The manifest is loaded once at construction and rewritten in full after
/// every mutating batch. Only one manager may write a repository's
/// manifest at a time.
pub struct QuarantineManager {
    repo_root: PathBuf,
    quarantine_dir: PathBuf,
    manifest_path: PathBuf,
    manifest: QuarantineManifest,
}

impl QuarantineManager {
    pub fn open(repo_root: &Path) -> Self {
        let repo_root = repo_root.canonicalize().unwrap_or_else(|_| repo_root.to_path_buf());
        let quarantine_dir = repo_root.join(QUARANTINE_DIR);
        let manifest_path = quarantine_dir.join(MANIFEST_FILE);
        let manifest = QuarantineManifest::load(&manifest_path);
        Self {
            repo_root,
            quarantine_dir,
            manifest_path,
            manifest,
        }
    }

    pub fn manifest(&self) -> &QuarantineManifest {
        &self.manifest
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    fn io_failure(path: &Path, source: io::Error) -> QuarantineFailure {
        QuarantineFailure::Io(CourtError::QuarantineIo {
            path: path.to_path_buf(),
            source,
        })
    }

    fn session_id(&self, requested: Option<&str>) -> Result<String> {
        if let Some(id) = requested {
            let single = Path::new(id).components().count() == 1
                && matches!(Path::new(id).components().next(), Some(Component::Normal(_)));
            if !single {
                return Err(CourtError::Configuration(format!("invalid session id: {}", id)));
            }
            return Ok(id.to_string());
        }
        let base = Local::now().format("%Y%m%d_%H%M%S").to_string();
        if self.manifest.session(&base).is_none() {
            return Ok(base);
        }
        Ok((2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|id| self.manifest.session(id).is_none())
            .unwrap_or(base))
    }

    /// Move each file to `quarantine/<session>/<path>`. Per-file failures are
    /// reported in the outcome list and never stop the batch. A dry run
    /// touches neither the files nor the manifest. If the manifest cannot be
    /// saved, every moved file is reported as an I/O failure.
    pub fn move_to_quarantine(
        &mut self,
        files: &[String],
        reasons: &BTreeMap<String, Vec<String>>,
        session_id: Option<&str>,
        dry_run: bool,
    ) -> Result<Vec<FileOutcome>> {
        let session_id = self.session_id(session_id)?;
        let session_dir = self.quarantine_dir.join(&session_id);
        let mut outcomes = Vec::with_capacity(files.len());
        let mut moved = Vec::new();

        for path in files {
            let outcome = self.move_one(path, &session_id, &session_dir, dry_run);
            match &outcome.failure {
                None if !dry_run => {
                    let quarantine_path = outcome.quarantine_path.clone().unwrap_or_default();
                    self.manifest.files.insert(
                        path.clone(),
                        FileRecord {
                            original_path: path.clone(),
                            quarantine_path: quarantine_path.clone(),
                            session_id: session_id.clone(),
                            timestamp: now_timestamp(),
                            reasons: reasons.get(path).cloned().unwrap_or_default(),
                            restored: false,
                            restored_at: None,
                            deleted: false,
                            deleted_at: None,
                            cleaned: false,
                            extra: BTreeMap::new(),
                        },
                    );
                    moved.push((path.clone(), quarantine_path));
                }
                None => {}
                Some(failure) => error!("Could not quarantine {}: {}", path, failure),
            }
            outcomes.push(outcome);
        }

        if !moved.is_empty() {
            self.manifest.quarantine_sessions.push(SessionRecord {
                session_id: session_id.clone(),
                timestamp: now_timestamp(),
                files_count: moved.len(),
                files: moved.iter().map(|(original, _)| original.clone()).collect(),
            });
            self.commit(&mut outcomes);
            match write_restore_script(&session_dir, &session_id, &moved) {
                Ok(script) => info!("Generated restore script: {}", script.display()),
                Err(e) => warn!("Could not write restore script for {}: {}", session_id, e),
            }
            info!("Quarantined {} files in session {}", moved.len(), session_id);
        }
        Ok(outcomes)
    }

    fn move_one(&self, path: &str, session_id: &str, session_dir: &Path, dry_run: bool) -> FileOutcome {
        let relative = match validate_relative(path) {
            Ok(relative) => relative,
            Err(failure) => return FileOutcome::failed(path, failure),
        };
        let source = self.repo_root.join(&relative);
        if !source.is_file() {
            return FileOutcome::failed(path, QuarantineFailure::NotFound);
        }
        let dest = session_dir.join(&relative);
        let quarantine_path = format!(
            "{}/{}/{}",
            QUARANTINE_DIR,
            session_id,
            relative.to_string_lossy().replace('\\', "/")
        );

        if !dry_run {
            if let Some(parent) = dest.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    return FileOutcome::failed(path, Self::io_failure(parent, e));
                }
            }
            if let Err(e) = move_file(&source, &dest) {
                return FileOutcome::failed(path, Self::io_failure(&source, e));
            }
            if let Some(parent) = source.parent() {
                self.prune_empty_dirs(parent);
            }
        }
        FileOutcome::succeeded(path, Some(quarantine_path), dry_run)
    }

    /// Remove now-empty directories from `dir` up to the repository root.
    fn prune_empty_dirs(&self, dir: &Path) {
        let mut current = dir.to_path_buf();
        while current != self.repo_root && current.starts_with(&self.repo_root) {
            let empty = fs::read_dir(&current)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !empty {
                break;
            }
            if let Err(e) = fs::remove_dir(&current) {
                warn!("Could not remove empty directory {}: {}", current.display(), e);
                break;
            }
            debug!("Removed empty directory {}", current.display());
            if !current.pop() {
                break;
            }
        }
    }

    fn restore_one(&mut self, path: &str, dry_run: bool) -> FileOutcome {
        let record = match self.manifest.files.get(path) {
            Some(record) => record,
            None => return FileOutcome::failed(path, QuarantineFailure::NotInManifest),
        };
        if record.restored {
            return FileOutcome::failed(path, QuarantineFailure::AlreadyRestored);
        }
        if record.deleted {
            return FileOutcome::failed(path, QuarantineFailure::Deleted);
        }
        let relative = match validate_relative(path) {
            Ok(relative) => relative,
            Err(failure) => return FileOutcome::failed(path, failure),
        };
        let quarantined = self.repo_root.join(&record.quarantine_path);
        if !quarantined.is_file() {
            return FileOutcome::failed(path, QuarantineFailure::QuarantinedCopyMissing);
        }
        let original = self.repo_root.join(relative);
        if original.exists() {
            return FileOutcome::failed(path, QuarantineFailure::DestinationExists);
        }
        let quarantine_path = Some(record.quarantine_path.clone());

        if !dry_run {
            if let Some(parent) = original.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    return FileOutcome::failed(path, Self::io_failure(parent, e));
                }
            }
            if let Err(e) = move_file(&quarantined, &original) {
                return FileOutcome::failed(path, Self::io_failure(&quarantined, e));
            }
            if let Some(record) = self.manifest.files.get_mut(path) {
                record.restored = true;
                record.restored_at = Some(now_timestamp());
            }
        }
        FileOutcome::succeeded(path, quarantine_path, dry_run)
    }

    fn commit(&mut self, outcomes: &mut [FileOutcome]) {
        if let Err(e) = self.manifest.save(&self.manifest_path) {
            error!("Could not save quarantine manifest: {}", e);
            let reason = e.to_string();
            for outcome in outcomes.iter_mut().filter(|o| o.is_success()) {
                outcome.failure = Some(QuarantineFailure::Io(CourtError::QuarantineIo {
                    path: self.manifest_path.clone(),
                    source: io::Error::new(io::ErrorKind::Other, reason.clone()),
                }));
            }
        }
    }

    /// Move one file back to its original path.
    pub fn restore_file(&mut self, path: &str, dry_run: bool) -> FileOutcome {
        let mut outcome = [self.restore_one(path, dry_run)];
        if outcome[0].is_success() && !dry_run {
            self.commit(&mut outcome);
        }
        let [outcome] = outcome;
        if let Some(failure) = &outcome.failure {
            error!("Could not restore {}: {}", path, failure);
        }
        outcome
    }

    /// Restore every file of a session. An unknown session yields a single
    /// failed outcome.
    pub fn restore_session(&mut self, session_id: &str, dry_run: bool) -> Vec<FileOutcome> {
        let files = match self.manifest.session(session_id) {
            Some(session) => session.files.clone(),
            None => {
                return vec![FileOutcome::failed(
                    session_id,
                    QuarantineFailure::SessionNotFound(session_id.to_string()),
                )]
            }
        };
        let mut outcomes: Vec<FileOutcome> = files.iter().map(|path| self.restore_one(path, dry_run)).collect();
        if !dry_run && outcomes.iter().any(FileOutcome::is_success) {
            self.commit(&mut outcomes);
        }
        for outcome in &outcomes {
            if let Some(failure) = &outcome.failure {
                error!("Could not restore {}: {}", outcome.path, failure);
            }
        }
        outcomes
    }

    /// Remove the quarantined copy for good. The manifest entry stays.
    pub fn permanently_delete(&mut self, path: &str) -> FileOutcome {
        let record = match self.manifest.files.get(path) {
            Some(record) => record,
            None => return FileOutcome::failed(path, QuarantineFailure::NotInManifest),
        };
        if record.restored {
            return FileOutcome::failed(path, QuarantineFailure::AlreadyRestored);
        }
        if record.deleted {
            return FileOutcome::failed(path, QuarantineFailure::Deleted);
        }
        let quarantined = self.repo_root.join(&record.quarantine_path);
        let quarantine_path = Some(record.quarantine_path.clone());
        if quarantined.exists() {
            if let Err(e) = fs::remove_file(&quarantined) {
                return FileOutcome::failed(path, Self::io_failure(&quarantined, e));
            }
        }
        if let Some(record) = self.manifest.files.get_mut(path) {
            record.deleted = true;
            record.deleted_at = Some(now_timestamp());
        }
        let mut outcome = [FileOutcome::succeeded(path, quarantine_path, false)];
        self.commit(&mut outcome);
        let [outcome] = outcome;
        outcome
    }

    /// Delete session directories older than `days` and flag their files
    /// as cleaned.
    pub fn cleanup_old_sessions(&mut self, days: i64) -> Result<CleanupReport> {
        let cutoff: NaiveDateTime = Local::now().naive_local() - Duration::days(days);
        let mut cleaned = 0;
        let mut cleaned_files = Vec::new();

        for session in &self.manifest.quarantine_sessions {
            let created = match parse_timestamp(&session.timestamp) {
                Some(created) => created,
                None => {
                    warn!("Session {} has an unreadable timestamp", session.session_id);
                    continue;
                }
            };
            if created >= cutoff {
                continue;
            }
            let dir = self.quarantine_dir.join(&session.session_id);
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|source| CourtError::QuarantineIo {
                    path: dir.clone(),
                    source,
                })?;
                cleaned += 1;
                cleaned_files.extend(session.files.iter().cloned());
                info!("Removed quarantine session {}", session.session_id);
            }
        }
        for path in cleaned_files {
            if let Some(record) = self.manifest.files.get_mut(&path) {
                record.cleaned = true;
            }
        }
        self.manifest.save(&self.manifest_path)?;

        Ok(CleanupReport {
            sessions_cleaned: cleaned,
            cutoff_date: cutoff.format("%Y-%m-%dT%H:%M:%S").to_string(),
        })
    }

    pub fn summary(&self) -> QuarantineSummary {
        let files = &self.manifest.files;
        let restored = files.values().filter(|r| r.restored).count();
        let deleted = files.values().filter(|r| r.deleted).count();
        QuarantineSummary {
            total_quarantined: files.len(),
            restored,
            deleted,
            pending: files.values().filter(|r| r.is_active()).count(),
            sessions: self.manifest.quarantine_sessions.len(),
            last_updated: self.manifest.last_updated.clone(),
        }
    }

    /// Records, newest first, optionally limited to one session.
    pub fn list(&self, session_id: Option<&str>) -> Vec<(&str, &FileRecord)> {
        let mut files: Vec<(&str, &FileRecord)> = self
            .manifest
            .files
            .iter()
            .filter(|(_, r)| session_id.map_or(true, |id| r.session_id == id))
            .map(|(path, record)| (path.as_str(), record))
            .collect();
        files.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then_with(|| a.0.cmp(b.0)));
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_relative() {
        assert!(validate_relative("src/app.py").is_ok());
        assert!(validate_relative("./notes.md").is_ok());
        assert!(validate_relative("../outside.py").is_err());
        assert!(validate_relative("src/../../outside.py").is_err());
        assert!(validate_relative("/etc/passwd").is_err());
        assert!(validate_relative("quarantine/s1/a.py").is_err());
        assert!(validate_relative("").is_err());
    }
}
