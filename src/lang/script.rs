use super::{ContentExtractor, ExtractorKind, Reference, SemanticContent};
use crate::error::Result;
use crate::resolver::SourceFile;
use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"import\s+.*?\s+from\s+['"]([^'"]+)['"]"#,
        r#"import\s+['"]([^'"]+)['"]"#,
        r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        r#"import\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FUNCTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"function\s+(\w+)",
        r"(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s*)?\(",
        r"(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?function",
        r"(?m)^\s*(?:async\s+)?(\w+)\s*\([^)]*\)\s*\{",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static CLASS_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"class\s+(\w+)").unwrap());
static JSDOC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*\*(.*?)\*/").unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)//\s*(.+)$").unwrap());

const CONTROL_WORDS: &[&str] = &["if", "for", "while", "switch", "catch", "function", "return"];

/// Secondary-language extractor for JavaScript and TypeScript sources.
pub struct ScriptExtractor;

impl ContentExtractor for ScriptExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::SecondaryCode
    }

    fn references(&self, file: &SourceFile) -> Result<Vec<Reference>> {
        let content = file.text();
        let mut refs = Vec::new();
        for pattern in IMPORT_PATTERNS.iter() {
            for caps in pattern.captures_iter(content) {
                let target = caps[1].trim();
                if target.is_empty() {
                    continue;
                }
                if target.starts_with('.') || target.starts_with('/') {
                    refs.push(Reference::Path(target.trim_start_matches('/').to_string()));
                } else {
                    refs.push(Reference::Module(target.to_string()));
                }
            }
        }
        Ok(refs)
    }

    fn semantic_content(&self, file: &SourceFile) -> SemanticContent {
        let content = file.text();
        let mut entities: Vec<String> = Vec::new();
        for pattern in FUNCTION_PATTERNS.iter() {
            for caps in pattern.captures_iter(content) {
                let name = &caps[1];
                if !CONTROL_WORDS.contains(&name) && !entities.iter().any(|e| e == name) {
                    entities.push(name.to_string());
                }
            }
        }
        for caps in CLASS_NAME.captures_iter(content) {
            if !entities.iter().any(|e| e == &caps[1]) {
                entities.push(caps[1].to_string());
            }
        }

        let mut parts: Vec<&str> = JSDOC.captures_iter(content).filter_map(|c| c.get(1)).map(|m| m.as_str()).collect();
        parts.extend(LINE_COMMENT.captures_iter(content).filter_map(|c| c.get(1)).map(|m| m.as_str()));
        parts.extend(entities.iter().map(|s| s.as_str()));

        SemanticContent {
            text: parts.join(" "),
            entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_forms() {
        let file = SourceFile::from_content(
            "web/app.js",
            "import React from 'react';\nimport './styles.css';\nconst api = require(\"./lib/api\");\nconst lazy = import('../pages/home');\n",
        );
        let refs = ScriptExtractor.references(&file).unwrap();
        assert!(refs.contains(&Reference::Module("react".into())));
        assert!(refs.contains(&Reference::Path("./styles.css".into())));
        assert!(refs.contains(&Reference::Path("./lib/api".into())));
        assert!(refs.contains(&Reference::Path("../pages/home".into())));
    }

    #[test]
    fn test_semantic_entities() {
        let file = SourceFile::from_content(
            "web/cart.js",
            "/** Shopping cart helpers */\nfunction addItem(item) {\n  if (item) {\n  }\n}\nconst clearCart = () => {};\nclass CartView {}\n",
        );
        let content = ScriptExtractor.semantic_content(&file);
        assert!(content.entities.contains(&"addItem".to_string()));
        assert!(content.entities.contains(&"clearCart".to_string()));
        assert!(content.entities.contains(&"CartView".to_string()));
        assert!(!content.entities.contains(&"if".to_string()));
        assert!(content.text.contains("Shopping cart helpers"));
    }
}
