use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "all", "also", "an", "and", "are", "as", "async", "at", "await", "be", "been", "both",
        "but", "by", "can", "catch", "class", "const", "could", "dare", "def", "did", "do", "does",
        "each", "elif", "else", "every", "except", "false", "few", "finally", "for", "from",
        "function", "had", "has", "have", "he", "here", "how", "i", "if", "import", "in", "is",
        "it", "its", "just", "let", "may", "might", "more", "most", "must", "need", "new", "no",
        "none", "nor", "not", "now", "null", "of", "on", "once", "only", "or", "other", "ought",
        "own", "raise", "return", "same", "self", "shall", "she", "should", "so", "some", "such",
        "than", "that", "the", "then", "there", "these", "they", "this", "those", "throw", "to",
        "too", "true", "try", "undefined", "used", "var", "very", "was", "we", "were", "what",
        "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    ]
    .into_iter()
    .collect()
});

static CODE_NOISE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract", "any", "array", "bool", "boolean", "default", "dict", "enum", "export",
        "extends", "float", "implements", "int", "interface", "list", "number", "object",
        "private", "protected", "public", "readonly", "set", "static", "str", "string", "tuple",
        "type", "void",
    ]
    .into_iter()
    .collect()
});

/// Topic name and its vocabulary test, applied to lowercased content.
static TOPIC_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("api", r"\b(api|endpoint|route|rest|graphql|request|response)\b"),
        ("database", r"\b(database|db|sql|query|table|schema|model|orm)\b"),
        ("auth", r"\b(auth|login|logout|password|token|jwt|oauth|session)\b"),
        ("test", r"\b(test|spec|mock|stub|fixture|assert|expect)\b"),
        ("config", r"\b(config|setting|environment|env|option|parameter)\b"),
        ("ui", r"\b(component|render|view|template|style|css|html|dom)\b"),
        ("util", r"\b(util|helper|common|shared|lib|tool)\b"),
        ("error", r"\b(error|exception|catch|throw|handle|log)\b"),
        ("async", r"\b(async|await|promise|callback|event|emit)\b"),
        ("data", r"\b(data|fetch|load|save|store|cache|parse)\b"),
        ("search", r"\b(search|find|query|filter|match|index)\b"),
        ("ai", r"\b(model|train|predict|inference|neural|embedding|vector)\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]{3,}\b").unwrap());

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word) || CODE_NOISE.contains(word)
}

/// Term counts after splitting compound identifiers and dropping
/// stop words, code noise and tokens shorter than three letters.
pub fn term_frequencies(text: &str) -> BTreeMap<String, usize> {
    let split = CAMEL_BOUNDARY.replace_all(text, "$1 $2");
    let normalized = split.to_lowercase().replace(['_', '-'], " ");

    let mut counts = BTreeMap::new();
    for m in WORD.find_iter(&normalized) {
        let word = m.as_str();
        if !is_stop_word(word) {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Topics whose vocabulary appears anywhere in `content`, in fixed order.
pub fn detect_topics(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    TOPIC_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(&lowered))
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_identifiers_are_split() {
        let freq = term_frequencies("parseInvoiceTotal load_invoice_items invoice-store");
        assert_eq!(freq.get("invoice"), Some(&3));
        assert_eq!(freq.get("parse"), Some(&1));
        assert_eq!(freq.get("total"), Some(&1));
        assert!(freq.contains_key("items"));
    }

    #[test]
    fn test_stop_words_and_short_tokens_dropped() {
        let freq = term_frequencies("the def of an id string returns value");
        assert!(!freq.contains_key("the"));
        assert!(!freq.contains_key("def"));
        assert!(!freq.contains_key("string"));
        assert!(!freq.contains_key("id"));
        assert!(freq.contains_key("returns"));
        assert!(freq.contains_key("value"));
    }

    #[test]
    fn test_topics() {
        let topics = detect_topics("The API endpoint checks the JWT token before the SQL query");
        assert!(topics.contains(&"api".to_string()));
        assert!(topics.contains(&"auth".to_string()));
        assert!(topics.contains(&"database".to_string()));
        assert!(topics.contains(&"search".to_string()));
        assert!(!topics.contains(&"ui".to_string()));
    }
}
