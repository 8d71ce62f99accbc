pub mod dependency_graph;
pub mod discovery;
pub mod file_classifier;

pub use dependency_graph::{DependencyGraph, DependencyGraphBuilder};
pub use discovery::{discover_files, relative_path, SourceFile, QUARANTINE_DIR};
pub use file_classifier::{FileCategory, FileClassifier};
