pub mod analyzer;
pub mod tokenizer;

pub use analyzer::{
    Cluster, DocLink, DuplicatePair, FileSemantics, SemanticAnalyzer, SemanticIndex, SemanticLink,
    SemanticReport,
};
pub use tokenizer::{detect_topics, term_frequencies};
