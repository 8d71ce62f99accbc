use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Coarse role of a file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Code,
    Documentation,
    Config,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Code => "code",
            FileCategory::Documentation => "documentation",
            FileCategory::Config => "config",
            FileCategory::Other => "other",
        }
    }
}

/// Extensions the court will look at. Anything else is never a candidate.
pub const ANALYZABLE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "mjs", "cjs", "json", "yaml", "yml", "toml", "ini", "cfg",
    "md", "rst", "txt", "html", "css", "scss", "less", "sh", "bash", "zsh", "sql", "graphql",
];

/// Substrings that put a path permanently out of reach.
pub const PROTECTED_PATTERNS: &[&str] = &[
    ".git/",
    ".github/",
    "node_modules/",
    "__pycache__/",
    ".env",
    "package-lock.json",
    "yarn.lock",
    "poetry.lock",
    "LICENSE",
    "CODEOWNERS",
    ".gitignore",
    ".gitattributes",
];

/// Directory names never descended into.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", "__pycache__", "venv", "env", "target"];

pub struct FileClassifier {
    excludes: Vec<Pattern>,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FileClassifier {
    pub fn new() -> Self {
        Self { excludes: Vec::new() }
    }

    /// Invalid patterns are dropped here; `CourtConfig::validate` reports them.
    pub fn with_excludes(patterns: &[String]) -> Self {
        let excludes = patterns
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self { excludes }
    }

    pub fn extension(path: &str) -> String {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default()
    }

    pub fn categorize(path: &str) -> FileCategory {
        match Self::extension(path).as_str() {
            "py" | "js" | "ts" | "jsx" | "tsx" | "mjs" | "cjs" => FileCategory::Code,
            "md" | "txt" | "rst" => FileCategory::Documentation,
            "json" | "yaml" | "yml" | "toml" | "ini" | "cfg" => FileCategory::Config,
            _ => FileCategory::Other,
        }
    }

    pub fn is_analyzable(path: &str) -> bool {
        let ext = Self::extension(path);
        ANALYZABLE_EXTENSIONS.contains(&ext.as_str())
    }

    /// `rel_path` is repository-relative and `/`-separated.
    pub fn is_protected(&self, rel_path: &str) -> bool {
        if PROTECTED_PATTERNS.iter().any(|p| rel_path.contains(p)) {
            return true;
        }
        self.excludes.iter().any(|p| p.matches(rel_path))
    }

    pub fn is_skipped_dir(name: &str) -> bool {
        name.starts_with('.') || SKIPPED_DIRS.contains(&name)
    }
}
