use super::{ContentExtractor, ExtractorKind, Reference, SemanticContent};
use crate::error::Result;
use crate::resolver::SourceFile;

/// Everything without a dedicated extractor: the full text is the only
/// semantic signal and no references are extracted.
pub struct PlainTextExtractor;

impl ContentExtractor for PlainTextExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Plain
    }

    fn references(&self, _file: &SourceFile) -> Result<Vec<Reference>> {
        Ok(Vec::new())
    }

    fn semantic_content(&self, file: &SourceFile) -> SemanticContent {
        SemanticContent {
            entities: Vec::new(),
            text: file.text().to_string(),
        }
    }
}
