//! Per-format content handling.
//!
//! Every analyzable extension maps to one [`ContentExtractor`]. The
//! dependency graph asks it for raw references and the semantic analyzer
//! asks it for identifiers and free text.

pub mod data;
pub mod plain;
pub mod prose;
pub mod python;
pub mod script;

use crate::error::Result;
use crate::resolver::SourceFile;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

pub use data::StructuredDataExtractor;
pub use plain::PlainTextExtractor;
pub use prose::ProseExtractor;
pub use python::PythonExtractor;
pub use script::ScriptExtractor;

/// An unresolved reference found in a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    /// Dotted or bare module name, e.g. `pkg.utils` or `lodash`.
    Module(String),
    /// Relative import, already anchored to the importing file's package
    /// as a repo-relative path without extension, e.g. `pkg/core/helpers`.
    RelativeModule(String),
    /// Path-like token, e.g. `./lib/api` or `docs/guide.md`.
    Path(String),
}

impl Reference {
    pub fn token(&self) -> &str {
        match self {
            Reference::Module(s) | Reference::RelativeModule(s) | Reference::Path(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    PrimaryCode,
    SecondaryCode,
    StructuredData,
    Prose,
    Plain,
}

/// Identifiers and natural-language text pulled from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticContent {
    pub entities: Vec<String>,
    pub text: String,
}

pub trait ContentExtractor: Send + Sync {
    fn kind(&self) -> ExtractorKind;

    /// Structured reference extraction. A `Parse` error makes the registry
    /// fall back to [`ContentExtractor::fallback_references`].
    fn references(&self, file: &SourceFile) -> Result<Vec<Reference>>;

    fn fallback_references(&self, _file: &SourceFile) -> Vec<Reference> {
        Vec::new()
    }

    fn semantic_content(&self, file: &SourceFile) -> SemanticContent;
}

pub struct ExtractorRegistry {
    by_extension: HashMap<&'static str, Arc<dyn ContentExtractor>>,
    plain: Arc<dyn ContentExtractor>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            by_extension: HashMap::new(),
            plain: Arc::new(PlainTextExtractor),
        };
        registry.register(&["py"], Arc::new(PythonExtractor));
        registry.register(
            &["js", "ts", "jsx", "tsx", "mjs", "cjs"],
            Arc::new(ScriptExtractor),
        );
        registry.register(&["json", "yaml", "yml", "toml"], Arc::new(StructuredDataExtractor));
        registry.register(&["md", "rst", "txt"], Arc::new(ProseExtractor));
        registry
    }

    pub fn register(&mut self, extensions: &[&'static str], extractor: Arc<dyn ContentExtractor>) {
        for ext in extensions {
            self.by_extension.insert(*ext, extractor.clone());
        }
    }

    pub fn for_extension(&self, extension: &str) -> &dyn ContentExtractor {
        self.by_extension
            .get(extension)
            .map(|e| e.as_ref())
            .unwrap_or_else(|| self.plain.as_ref())
    }

    /// References for `file`, deduplicated and sorted. Unreadable files
    /// yield nothing.
    pub fn references(&self, file: &SourceFile) -> Vec<Reference> {
        if file.content.is_none() {
            return Vec::new();
        }
        let extractor = self.for_extension(&file.extension);
        let mut refs = match extractor.references(file) {
            Ok(refs) => refs,
            Err(e) => {
                debug!("{}; using pattern extraction", e);
                extractor.fallback_references(file)
            }
        };
        refs.sort();
        refs.dedup();
        refs
    }

    pub fn semantic_content(&self, file: &SourceFile) -> SemanticContent {
        if file.content.is_none() {
            return SemanticContent::default();
        }
        self.for_extension(&file.extension).semantic_content(file)
    }
}
