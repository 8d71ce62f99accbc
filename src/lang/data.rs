use super::{ContentExtractor, ExtractorKind, Reference, SemanticContent};
use crate::error::{CourtError, Result};
use crate::resolver::SourceFile;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const MAX_DEPTH: usize = 10;
const MAX_PATH_LEN: usize = 200;

/// Keys whose string values are taken as references even when they do not
/// look like paths.
const PATH_KEYS: &[&str] = &["path", "file", "main", "entry_point", "include", "source", "config"];

static HAS_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\w{1,5}$").unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"\n]+)"|'([^'\n]+)'"#).unwrap());

pub fn looks_like_path(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_PATH_LEN || value.contains("://") {
        return false;
    }
    HAS_EXTENSION.is_match(value)
        || value.starts_with("./")
        || value.starts_with("../")
        || value.contains('/')
}

/// JSON, YAML and TOML. YAML and TOML documents are converted into
/// `serde_json::Value` so every format shares one walker.
pub struct StructuredDataExtractor;

impl StructuredDataExtractor {
    fn parse(file: &SourceFile) -> Result<Value> {
        let text = file.text();
        match file.extension.as_str() {
            "json" => serde_json::from_str(text).map_err(|e| CourtError::parse(&file.path, e)),
            "toml" => {
                let table: toml::Table = toml::from_str(text).map_err(|e| CourtError::parse(&file.path, e))?;
                serde_json::to_value(table).map_err(|e| CourtError::parse(&file.path, e))
            }
            _ => {
                let yaml: serde_yaml::Value =
                    serde_yaml::from_str(text).map_err(|e| CourtError::parse(&file.path, e))?;
                serde_json::to_value(yaml).map_err(|e| CourtError::parse(&file.path, e))
            }
        }
    }
}

fn walk_references(root: &Value, refs: &mut Vec<Reference>) {
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];
    while let Some((value, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            continue;
        }
        match value {
            Value::String(s) if looks_like_path(s) => refs.push(Reference::Path(s.clone())),
            Value::Object(map) => {
                for (key, child) in map {
                    if PATH_KEYS.contains(&key.as_str()) {
                        if let Value::String(s) = child {
                            if !looks_like_path(s) && !s.is_empty() {
                                refs.push(Reference::Path(s.clone()));
                            }
                        }
                    }
                    stack.push((child, depth + 1));
                }
            }
            Value::Array(items) => {
                for item in items {
                    stack.push((item, depth + 1));
                }
            }
            _ => {}
        }
    }
}

fn walk_semantics(root: &Value, content: &mut SemanticContent) {
    let mut texts = Vec::new();
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];
    while let Some((value, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            continue;
        }
        match value {
            Value::String(s) => texts.push(s.as_str()),
            Value::Object(map) => {
                for (key, child) in map.iter().rev() {
                    content.entities.push(key.clone());
                    stack.push((child, depth + 1));
                }
            }
            Value::Array(items) => {
                for item in items.iter().rev() {
                    stack.push((item, depth + 1));
                }
            }
            _ => {}
        }
    }
    content.text = texts.join(" ");
}

impl ContentExtractor for StructuredDataExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::StructuredData
    }

    fn references(&self, file: &SourceFile) -> Result<Vec<Reference>> {
        let value = Self::parse(file)?;
        let mut refs = Vec::new();
        walk_references(&value, &mut refs);
        Ok(refs)
    }

    fn fallback_references(&self, file: &SourceFile) -> Vec<Reference> {
        QUOTED
            .captures_iter(file.text())
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str())
            .filter(|s| looks_like_path(s))
            .map(|s| Reference::Path(s.to_string()))
            .collect()
    }

    fn semantic_content(&self, file: &SourceFile) -> SemanticContent {
        let mut content = SemanticContent::default();
        match Self::parse(file) {
            Ok(value) => walk_semantics(&value, &mut content),
            Err(_) => content.text = file.text().to_string(),
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_path() {
        assert!(looks_like_path("src/app.py"));
        assert!(looks_like_path("./run"));
        assert!(looks_like_path("settings.yaml"));
        assert!(!looks_like_path("hello world"));
        assert!(!looks_like_path("https://example.com/a"));
        assert!(!looks_like_path(&"a/".repeat(150)));
    }

    #[test]
    fn test_json_walk() {
        let file = SourceFile::from_content(
            "package.json",
            r#"{"name": "demo", "main": "server", "scripts": {"build": "node tools/build.js"}, "files": ["lib/index.js"]}"#,
        );
        let refs = StructuredDataExtractor.references(&file).unwrap();
        assert!(refs.contains(&Reference::Path("server".into())));
        assert!(refs.contains(&Reference::Path("lib/index.js".into())));
        assert!(refs.contains(&Reference::Path("node tools/build.js".into())));
        assert!(!refs.contains(&Reference::Path("demo".into())));
    }

    #[test]
    fn test_yaml_walk_and_semantics() {
        let file = SourceFile::from_content(
            "deploy.yml",
            "service:\n  entry_point: gateway.py\n  description: routes traffic\n",
        );
        let refs = StructuredDataExtractor.references(&file).unwrap();
        assert!(refs.contains(&Reference::Path("gateway.py".into())));
        let content = StructuredDataExtractor.semantic_content(&file);
        assert!(content.entities.contains(&"entry_point".to_string()));
        assert!(content.text.contains("routes traffic"));
    }

    #[test]
    fn test_toml_walk() {
        let file = SourceFile::from_content(
            "pyproject.toml",
            "[project]\nname = \"billing\"\nreadme = \"docs/README.md\"\n\n[tool.runner]\nentry_point = \"serve\"\n",
        );
        let refs = StructuredDataExtractor.references(&file).unwrap();
        assert!(refs.contains(&Reference::Path("docs/README.md".into())));
        assert!(refs.contains(&Reference::Path("serve".into())));
        assert!(!refs.contains(&Reference::Path("billing".into())));
        let content = StructuredDataExtractor.semantic_content(&file);
        assert!(content.entities.contains(&"readme".to_string()));
    }

    #[test]
    fn test_invalid_json_falls_back_to_quoted_strings() {
        let file = SourceFile::from_content("broken.json", "{\"main\": \"src/app.js\",,, }");
        assert!(StructuredDataExtractor.references(&file).is_err());
        let refs = StructuredDataExtractor.fallback_references(&file);
        assert_eq!(refs, vec![Reference::Path("src/app.js".into())]);
    }
}
