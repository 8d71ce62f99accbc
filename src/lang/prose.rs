use super::{ContentExtractor, ExtractorKind, Reference, SemanticContent};
use crate::error::Result;
use crate::resolver::SourceFile;
use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*?\]\(([^)]+)\)").unwrap());
static REFERENCE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\[[^\]]*?\]:\s*(\S+)").unwrap());
static FENCE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^```\w*[ \t]+(?:title=)?([\w./\-]+\.\w{1,5})[ \t]*$").unwrap());

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.+)$").unwrap());
static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());

const EXTERNAL_PREFIXES: &[&str] = &["http://", "https://", "mailto:", "#"];

/// Strip an optional link title and `#anchor` from a link target.
fn clean_target(raw: &str) -> Option<String> {
    let target = raw.trim().split_whitespace().next()?;
    let target = target.trim_matches(|c| c == '<' || c == '>');
    if EXTERNAL_PREFIXES.iter().any(|p| target.starts_with(p)) {
        return None;
    }
    let target = target.split('#').next().unwrap_or("");
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}

/// Markdown and other prose documents.
pub struct ProseExtractor;

impl ContentExtractor for ProseExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Prose
    }

    fn references(&self, file: &SourceFile) -> Result<Vec<Reference>> {
        let content = file.text();
        let refs = INLINE_LINK
            .captures_iter(content)
            .chain(REFERENCE_LINK.captures_iter(content))
            .chain(FENCE_FILENAME.captures_iter(content))
            .filter_map(|c| clean_target(&c[1]))
            .map(Reference::Path)
            .collect();
        Ok(refs)
    }

    fn semantic_content(&self, file: &SourceFile) -> SemanticContent {
        let content = file.text();
        let entities = HEADING
            .captures_iter(content)
            .map(|c| c[1].trim().to_string())
            .collect();
        let without_blocks = CODE_BLOCK.replace_all(content, " ");
        let text = INLINE_CODE.replace_all(&without_blocks, " ").into_owned();
        SemanticContent { entities, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_and_exclusions() {
        let file = SourceFile::from_content(
            "docs/guide.md",
            "See [setup](../README.md#install) and [api](api.md \"API\").\n\
             Visit [site](https://example.com) or [top](#top).\n\n\
             [ref]: ./reference.md\n\n\
             ```python config/settings.py\nDEBUG = True\n```\n",
        );
        let refs = ProseExtractor.references(&file).unwrap();
        assert!(refs.contains(&Reference::Path("../README.md".into())));
        assert!(refs.contains(&Reference::Path("api.md".into())));
        assert!(refs.contains(&Reference::Path("./reference.md".into())));
        assert!(refs.contains(&Reference::Path("config/settings.py".into())));
        assert_eq!(refs.len(), 4);
    }

    #[test]
    fn test_semantic_content_strips_code() {
        let file = SourceFile::from_content(
            "notes.md",
            "# Payment Flow\nCharges are captured `later`.\n```\nsecret_code_here()\n```\n",
        );
        let content = ProseExtractor.semantic_content(&file);
        assert_eq!(content.entities, vec!["Payment Flow".to_string()]);
        assert!(content.text.contains("Charges are captured"));
        assert!(!content.text.contains("secret_code_here"));
        assert!(!content.text.contains("later"));
    }
}
