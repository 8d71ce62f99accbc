use crate::config::GitConfig;
use crate::resolver::relative_path;
use chrono::{DateTime, TimeZone, Utc};
use git2::{Repository, Sort};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileActivity {
    pub commits: usize,
    pub last_commit: Option<DateTime<Utc>>,
    pub contributors: BTreeSet<String>,
}

/// Per-file commit history, collected once per run from a bounded walk.
#[derive(Debug, Clone, Default)]
pub struct GitActivity {
    files: HashMap<String, FileActivity>,
}

impl GitActivity {
    pub fn activity(&self, path: &str) -> Option<&FileActivity> {
        self.files.get(path)
    }

    pub fn tracked_files(&self) -> usize {
        self.files.len()
    }

    /// Collect history on a helper thread. Returns `None` when the
    /// repository has no history or the walk does not finish in time.
    pub fn collect(root: &Path, config: &GitConfig) -> Option<GitActivity> {
        if !config.enabled {
            return None;
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        let deadline = Instant::now() + timeout;
        let max_commits = config.max_commits;
        let root: PathBuf = root.to_path_buf();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let _ = tx.send(Self::walk(&root, max_commits, deadline));
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(activity)) => {
                debug!("Collected history for {} files", activity.tracked_files());
                Some(activity)
            }
            Ok(Err(e)) => {
                debug!("No source-control history available: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    "Source-control history timed out after {}ms; skipping activity evidence",
                    config.timeout_ms
                );
                None
            }
        }
    }

    fn walk(root: &Path, max_commits: usize, deadline: Instant) -> Result<GitActivity, git2::Error> {
        let repo = Repository::discover(root)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| git2::Error::from_str("bare repository"))?;
        let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        // Prefix of the analyzed root inside the work tree, e.g. "services/api/"
        let prefix = relative_path(&workdir, &root)
            .map(|p| format!("{}/", p))
            .unwrap_or_default();

        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME)?;

        let mut activity = GitActivity::default();
        for oid in revwalk.take(max_commits) {
            if Instant::now() > deadline {
                break;
            }
            let commit = repo.find_commit(oid?)?;
            let tree = commit.tree()?;
            let parent_tree = if commit.parent_count() > 0 {
                Some(commit.parent(0)?.tree()?)
            } else {
                None
            };
            let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
            let author = commit.author().name().unwrap_or("unknown").to_string();
            let when = Utc.timestamp_opt(commit.time().seconds(), 0).single();

            for delta in diff.deltas() {
                let path = match delta.new_file().path().or_else(|| delta.old_file().path()) {
                    Some(p) => p.to_string_lossy().replace('\\', "/"),
                    None => continue,
                };
                let rel = match path.strip_prefix(&prefix) {
                    Some(rel) => rel.to_string(),
                    None => continue,
                };
                let entry = activity.files.entry(rel).or_default();
                entry.commits += 1;
                entry.contributors.insert(author.clone());
                if when > entry.last_commit {
                    entry.last_commit = when;
                }
            }
        }
        Ok(activity)
    }
}

#[cfg(test)]
impl GitActivity {
    pub fn insert(&mut self, path: &str, activity: FileActivity) {
        self.files.insert(path.to_string(), activity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disabled_returns_none() {
        let dir = TempDir::new().unwrap();
        let config = GitConfig {
            enabled: false,
            ..GitConfig::default()
        };
        assert!(GitActivity::collect(dir.path(), &config).is_none());
    }

    #[test]
    fn test_history_is_collected() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("app.py"), "print('v1')\n").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("app.py")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Dev One", "one@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();

        let activity = GitActivity::collect(dir.path(), &GitConfig::default()).unwrap();
        let file = activity.activity("app.py").unwrap();
        assert_eq!(file.commits, 1);
        assert!(file.last_commit.is_some());
        assert!(file.contributors.contains("Dev One"));
    }
}
