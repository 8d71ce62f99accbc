use super::{ContentExtractor, ExtractorKind, Reference, SemanticContent};
use crate::error::{CourtError, Result};
use crate::resolver::SourceFile;
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::{Node, Parser};

static FALLBACK_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^import\s+(\w+)").unwrap());
static FALLBACK_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^from\s+([\w.]+)\s+import").unwrap());

static DEF_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"def\s+(\w+)").unwrap());
static CLASS_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"class\s+(\w+)").unwrap());
static DOCSTRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)"""(.*?)"""|'''(.*?)'''"#).unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)#\s*(.+)$").unwrap());

/// Primary-language extractor. Imports come from a tree-sitter parse.
pub struct PythonExtractor;

fn first_segment(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

/// Repo-relative path of the module a relative import names: the file's
/// directory, `levels - 1` steps up, joined with the dotted module.
fn anchored_path(file: &SourceFile, levels: usize, module: &str) -> String {
    let mut parts: Vec<&str> = file.parent().split('/').filter(|p| !p.is_empty()).collect();
    for _ in 1..levels {
        parts.pop();
    }
    parts.extend(module.split('.').filter(|p| !p.is_empty()));
    parts.join("/")
}

fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// `dotted_name` directly, or the `name` of an `aliased_import`.
fn imported_name<'a>(node: Node, source: &'a [u8]) -> &'a str {
    if node.kind() == "aliased_import" {
        node.child_by_field_name("name")
            .map(|n| node_text(n, source))
            .unwrap_or("")
    } else {
        node_text(node, source)
    }
}

fn collect_import(node: Node, source: &[u8], refs: &mut Vec<Reference>) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let module = imported_name(name, source);
        if module.is_empty() {
            continue;
        }
        refs.push(Reference::Module(first_segment(module).to_string()));
        refs.push(Reference::Module(module.to_string()));
    }
}

fn collect_from_import(node: Node, source: &[u8], file: &SourceFile, refs: &mut Vec<Reference>) {
    let module_node = match node.child_by_field_name("module_name") {
        Some(n) => n,
        None => return,
    };
    let mut cursor = node.walk();
    let names: Vec<&str> = node
        .children_by_field_name("name", &mut cursor)
        .map(|n| imported_name(n, source))
        .filter(|n| !n.is_empty())
        .collect();

    if module_node.kind() == "relative_import" {
        let text = node_text(module_node, source);
        let levels = text.chars().take_while(|c| *c == '.').count();
        let module = text[levels..].trim();
        if module.is_empty() {
            // `from . import sibling`
            for name in names {
                refs.push(Reference::RelativeModule(anchored_path(file, levels, name)));
            }
        } else {
            refs.push(Reference::RelativeModule(anchored_path(file, levels, module)));
        }
        return;
    }

    let module = node_text(module_node, source);
    if module.is_empty() {
        return;
    }
    refs.push(Reference::Module(module.to_string()));
    refs.push(Reference::Module(first_segment(module).to_string()));
    for name in names {
        refs.push(Reference::Module(format!("{}.{}", module, name)));
    }
}

impl ContentExtractor for PythonExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::PrimaryCode
    }

    fn references(&self, file: &SourceFile) -> Result<Vec<Reference>> {
        let source = file.text();
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| CourtError::parse(&file.path, e))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| CourtError::parse(&file.path, "parser returned no tree"))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(CourtError::parse(&file.path, "syntax error"));
        }

        let bytes = source.as_bytes();
        let mut refs = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => collect_import(node, bytes, &mut refs),
                "import_from_statement" => collect_from_import(node, bytes, file, &mut refs),
                _ => {
                    let mut cursor = node.walk();
                    let children: Vec<Node> = node.children(&mut cursor).collect();
                    stack.extend(children.into_iter().rev());
                }
            }
        }
        Ok(refs)
    }

    fn fallback_references(&self, file: &SourceFile) -> Vec<Reference> {
        let mut refs = Vec::new();
        for line in file.text().lines() {
            let line = line.trim();
            let captured = FALLBACK_IMPORT
                .captures(line)
                .or_else(|| FALLBACK_FROM.captures(line));
            if let Some(caps) = captured {
                refs.push(Reference::Module(first_segment(&caps[1]).to_string()));
            }
        }
        refs
    }

    fn semantic_content(&self, file: &SourceFile) -> SemanticContent {
        let content = file.text();
        let mut entities: Vec<String> = DEF_NAME
            .captures_iter(content)
            .chain(CLASS_NAME.captures_iter(content))
            .map(|c| c[1].to_string())
            .collect();
        entities.sort();
        entities.dedup();

        let mut parts: Vec<&str> = DOCSTRING
            .captures_iter(content)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str())
            .collect();
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

    fn refs(path: &str, content: &str) -> Vec<Reference> {
        let file = SourceFile::from_content(path, content);
        let mut refs = PythonExtractor.references(&file).unwrap();
        refs.sort();
        refs.dedup();
        refs
    }

    #[test]
    fn test_plain_and_dotted_imports() {
        let found = refs("app.py", "import os\nimport pkg.util as u\n");
        assert!(found.contains(&Reference::Module("os".into())));
        assert!(found.contains(&Reference::Module("pkg".into())));
        assert!(found.contains(&Reference::Module("pkg.util".into())));
    }

    #[test]
    fn test_from_imports_emit_submodule_candidates() {
        let found = refs("app.py", "from services import billing, auth as a\n");
        assert!(found.contains(&Reference::Module("services".into())));
        assert!(found.contains(&Reference::Module("services.billing".into())));
        assert!(found.contains(&Reference::Module("services.auth".into())));
    }

    #[test]
    fn test_relative_imports_are_anchored() {
        let found = refs("pkg/core/engine.py", "from .helpers import x\nfrom ..shared import y\nfrom . import sibling\n");
        assert!(found.contains(&Reference::RelativeModule("pkg/core/helpers".into())));
        assert!(found.contains(&Reference::RelativeModule("pkg/shared".into())));
        assert!(found.contains(&Reference::RelativeModule("pkg/core/sibling".into())));
    }

    #[test]
    fn test_dotted_relative_module_becomes_a_path() {
        let found = refs("engine.py", "from .codecs.json import dump
");
        assert!(found.contains(&Reference::RelativeModule("codecs/json".into())));
    }

    #[test]
    fn test_nested_imports_are_found() {
        let found = refs("app.py", "def load():\n    import json\n    return json\n");
        assert!(found.contains(&Reference::Module("json".into())));
    }

    #[test]
    fn test_semantic_content() {
        let file = SourceFile::from_content(
            "svc.py",
            "\"\"\"Billing service.\"\"\"\n# handles invoices\nclass InvoiceStore:\n    def save_invoice(self):\n        pass\n",
        );
        let content = PythonExtractor.semantic_content(&file);
        assert!(content.entities.contains(&"save_invoice".to_string()));
        assert!(content.entities.contains(&"InvoiceStore".to_string()));
        assert!(content.text.contains("Billing service."));
        assert!(content.text.contains("handles invoices"));
    }

    #[test]
    fn test_entities_are_unique() {
        let file = SourceFile::from_content(
            "svc.py",
            "def save():\n    pass\n\nclass Store:\n    pass\n\ndef save():\n    pass\n",
        );
        let content = PythonExtractor.semantic_content(&file);
        assert_eq!(content.entities, vec!["Store".to_string(), "save".to_string()]);
    }
}
