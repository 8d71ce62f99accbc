use super::git_activity::GitActivity;
use crate::config::CourtConfig;
use crate::error::Result;
use crate::lang::ExtractorRegistry;
use crate::resolver::{discover_files, DependencyGraph, DependencyGraphBuilder, FileClassifier, SourceFile};
use crate::semantics::{SemanticAnalyzer, SemanticIndex};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Default file names treated as program entry points.
pub const DEFAULT_ENTRY_POINTS: &[&str] = &[
    "main.py",
    "index.js",
    "server.js",
    "app.py",
    "gateway.py",
    "index.ts",
    "main.js",
    "setup.py",
    "manage.py",
    "__main__.py",
    "Dockerfile",
    "docker-compose.yml",
    "Procfile",
    "Makefile",
    "package.json",
    "requirements.txt",
    "pyproject.toml",
];

/// SHA-256 of the content with all whitespace runs collapsed.
pub fn normalized_hash(content: &str) -> String {
    let normalized = content.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

pub fn word_set(content: &str) -> HashSet<String> {
    WORD.find_iter(content).map(|m| m.as_str().to_lowercase()).collect()
}

/// One read-only snapshot of the repository shared by every trial.
pub struct Corpus {
    pub root: PathBuf,
    pub entry_points: BTreeSet<String>,
    pub graph: DependencyGraph,
    pub semantics: SemanticIndex,
    pub git: Option<GitActivity>,
    files: Vec<SourceFile>,
    index: HashMap<String, usize>,
    hashes: HashMap<String, String>,
    hash_groups: HashMap<String, Vec<String>>,
    word_sets: HashMap<String, HashSet<String>>,
}

impl Corpus {
    /// Discover files under the configured root and build every shared model.
    pub fn build(config: &CourtConfig) -> Result<Self> {
        config.validate()?;
        let classifier = FileClassifier::with_excludes(&config.exclude);
        let files = discover_files(&config.repo_root, &classifier);
        info!("Found {} analyzable files", files.len());

        let mut entry_points: BTreeSet<String> =
            DEFAULT_ENTRY_POINTS.iter().map(|s| s.to_string()).collect();
        entry_points.extend(config.entry_points.iter().cloned());

        let git = GitActivity::collect(&config.repo_root, &config.git);
        Ok(Self::from_files(&config.repo_root, files, entry_points, git))
    }

    pub fn from_files(
        root: &Path,
        files: Vec<SourceFile>,
        entry_points: BTreeSet<String>,
        git: Option<GitActivity>,
    ) -> Self {
        let registry = ExtractorRegistry::new();
        let graph = DependencyGraphBuilder::new(&registry).build(&files);
        let semantics = SemanticAnalyzer::new(&registry).analyze(&files);

        let mut index = HashMap::new();
        let mut hashes = HashMap::new();
        let mut hash_groups: HashMap<String, Vec<String>> = HashMap::new();
        let mut word_sets = HashMap::new();
        for (i, file) in files.iter().enumerate() {
            index.insert(file.path.clone(), i);
            if let Some(content) = file.content.as_deref() {
                if !content.trim().is_empty() {
                    let hash = normalized_hash(content);
                    hash_groups.entry(hash.clone()).or_default().push(file.path.clone());
                    hashes.insert(file.path.clone(), hash);
                }
                word_sets.insert(file.path.clone(), word_set(content));
            }
        }

        Self {
            root: root.to_path_buf(),
            entry_points,
            graph,
            semantics,
            git,
            files,
            index,
            hashes,
            hash_groups,
            word_sets,
        }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    pub fn is_entry_point(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.entry_points.contains(path) || self.entry_points.contains(name)
    }

    /// Other files whose normalized content hash equals this file's.
    pub fn exact_duplicates(&self, path: &str) -> Vec<&str> {
        self.hashes
            .get(path)
            .and_then(|h| self.hash_groups.get(h))
            .map(|group| group.iter().filter(|p| *p != path).map(|p| p.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn word_set(&self, path: &str) -> Option<&HashSet<String>> {
        self.word_sets.get(path)
    }

    /// Files whose content mentions `path` by file name or by stem.
    pub fn mentions_of(&self, path: &str) -> Vec<&str> {
        let target = match self.file(path) {
            Some(f) => f,
            None => return Vec::new(),
        };
        let name = target.file_name();
        let stem = target.stem();
        self.files
            .iter()
            .filter(|f| f.path != path)
            .filter(|f| {
                let text = f.text();
                text.contains(name) || contains_word(text, stem)
            })
            .map(|f| f.path.as_str())
            .collect()
    }
}

/// `needle` occurs in `haystack` delimited by non-identifier characters.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.len() < 3 {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.map_or(false, is_ident) && !after.map_or(false, is_ident)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_hash_ignores_whitespace() {
        assert_eq!(normalized_hash("a  b\n\tc\n"), normalized_hash("a b c"));
        assert_ne!(normalized_hash("a b c"), normalized_hash("a b d"));
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("see billing for details", "billing"));
        assert!(contains_word("import billing.core", "billing"));
        assert!(!contains_word("rebilling happens", "billing"));
        assert!(!contains_word("ab", "ab"));
    }

    #[test]
    fn test_mentions_and_duplicates() {
        let files = vec![
            SourceFile::from_content("billing.py", "x = 1\n"),
            SourceFile::from_content("copy.py", "x  =  1\n"),
            SourceFile::from_content("notes.md", "The billing module.\n"),
        ];
        let corpus = Corpus::from_files(Path::new("."), files, BTreeSet::new(), None);
        assert_eq!(corpus.exact_duplicates("billing.py"), vec!["copy.py"]);
        assert_eq!(corpus.mentions_of("billing.py"), vec!["notes.md"]);
    }
}
