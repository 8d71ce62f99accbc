use crate::error::{CourtError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the optional per-repository configuration file.
pub const CONFIG_FILE_NAME: &str = "file-court.toml";

pub const DEFAULT_SUSPICION_THRESHOLD: f64 = 0.5;

/// Evidence scaling applied by the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Defense evidence is amplified by 15%.
    #[default]
    Conservative,
    /// Both sides are weighed as computed.
    Aggressive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub max_commits: usize,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5000,
            max_commits: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourtConfig {
    #[serde(skip)]
    pub repo_root: PathBuf,
    pub suspicion_threshold: f64,
    pub mode: Mode,
    pub entry_points: BTreeSet<String>,
    pub exclude: Vec<String>,
    pub parallel: bool,
    pub git: GitConfig,
}

impl Default for CourtConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("."),
            suspicion_threshold: DEFAULT_SUSPICION_THRESHOLD,
            mode: Mode::Conservative,
            entry_points: BTreeSet::new(),
            exclude: Vec::new(),
            parallel: true,
            git: GitConfig::default(),
        }
    }
}

impl CourtConfig {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            ..Self::default()
        }
    }

    /// Load `file-court.toml` from the repository root if present,
    /// otherwise fall back to defaults.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join(CONFIG_FILE_NAME);
        let mut config = if path.is_file() {
            info!("Loading configuration from {}", path.display());
            Self::from_file(&path)?
        } else {
            debug!("No {} found, using defaults", CONFIG_FILE_NAME);
            Self::default()
        };
        config.repo_root = repo_root.to_path_buf();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| CourtError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| {
            CourtError::Configuration(format!("invalid {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.repo_root.exists() {
            return Err(CourtError::Configuration(format!(
                "repository root {} does not exist",
                self.repo_root.display()
            )));
        }
        if !self.repo_root.is_dir() {
            return Err(CourtError::Configuration(format!(
                "repository root {} is not a directory",
                self.repo_root.display()
            )));
        }
        if !(0.0..=1.0).contains(&self.suspicion_threshold) {
            return Err(CourtError::Configuration(format!(
                "suspicion threshold {} is outside [0, 1]",
                self.suspicion_threshold
            )));
        }
        for pattern in &self.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                CourtError::Configuration(format!("bad exclude pattern {:?}: {}", pattern, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = CourtConfig::load(dir.path()).unwrap();
        assert_eq!(config.suspicion_threshold, DEFAULT_SUSPICION_THRESHOLD);
        assert_eq!(config.mode, Mode::Conservative);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "suspicion_threshold = 0.7\nmode = \"aggressive\"\nentry_points = [\"run.py\"]\n\n[git]\nenabled = false\n",
        )
        .unwrap();
        let config = CourtConfig::load(dir.path()).unwrap();
        assert_eq!(config.suspicion_threshold, 0.7);
        assert_eq!(config.mode, Mode::Aggressive);
        assert!(config.entry_points.contains("run.py"));
        assert!(!config.git.enabled);
        assert_eq!(config.git.timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_root_is_fatal() {
        let config = CourtConfig::new("/definitely/not/a/real/repo");
        assert!(matches!(config.validate(), Err(CourtError::Configuration(_))));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let dir = TempDir::new().unwrap();
        let mut config = CourtConfig::new(dir.path());
        config.suspicion_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
