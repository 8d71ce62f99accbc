use super::tokenizer::{detect_topics, term_frequencies};
use crate::lang::ExtractorRegistry;
use crate::resolver::{FileCategory, SourceFile};
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub const MAX_KEYWORDS: usize = 30;
pub const MAX_LINKS_PER_FILE: usize = 10;
pub const LINK_THRESHOLD: f64 = 0.3;
pub const CLUSTER_THRESHOLD: f64 = 0.5;
pub const DUPLICATE_THRESHOLD: f64 = 0.85;
pub const DOC_LINK_THRESHOLD: f64 = 0.3;
pub const CODE_WITHOUT_DOC_MIN_ENTITIES: usize = 5;
const ISOLATION_THRESHOLD: f64 = 0.2;

/// Semantic profile of one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileSemantics {
    pub path: String,
    pub category: FileCategory,
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
    #[serde(skip)]
    pub term_freq: BTreeMap<String, usize>,
    #[serde(skip)]
    pub tf_idf: BTreeMap<String, f64>,
    #[serde(skip)]
    norm: f64,
}

impl FileSemantics {
    fn stem(&self) -> String {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(idx) if idx > 0 => name[..idx].to_lowercase(),
            _ => name.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticLink {
    pub target: String,
    pub similarity: f64,
    pub topic_overlap: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub topic: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocLink {
    DocToCode { doc_file: String, code_file: String, score: f64 },
    DocWithoutCode { doc_file: String, topic: String, expected: String },
    CodeWithoutDoc { code_file: String, entities_count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicatePair {
    pub first: String,
    pub second: String,
    pub similarity: f64,
    pub category: FileCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticReport {
    pub total_files: usize,
    pub clusters: Vec<Cluster>,
    pub doc_links: Vec<DocLink>,
    pub duplicates: Vec<DuplicatePair>,
    pub warnings: Vec<String>,
}

/// Extracts per-file semantics and builds the corpus-wide TF-IDF model.
pub struct SemanticAnalyzer<'a> {
    registry: &'a ExtractorRegistry,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(registry: &'a ExtractorRegistry) -> Self {
        Self { registry }
    }

    pub fn analyze(&self, files: &[SourceFile]) -> SemanticIndex {
        let mut semantics: BTreeMap<String, FileSemantics> = BTreeMap::new();
        for file in files {
            let extracted = self.registry.semantic_content(file);
            semantics.insert(
                file.path.clone(),
                FileSemantics {
                    path: file.path.clone(),
                    category: file.category,
                    keywords: Vec::new(),
                    topics: detect_topics(file.text()),
                    term_freq: term_frequencies(&extracted.text),
                    entities: extracted.entities,
                    tf_idf: BTreeMap::new(),
                    norm: 0.0,
                },
            );
        }

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for sem in semantics.values() {
            for term in sem.term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let n = semantics.len() as f64;
        for sem in semantics.values_mut() {
            let total = sem.term_freq.values().sum::<usize>().max(1) as f64;
            for (term, count) in &sem.term_freq {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                let idf = ((n + 1.0) / (df + 1.0)).ln();
                sem.tf_idf.insert(term.clone(), (*count as f64 / total) * idf);
            }
            sem.norm = sem.tf_idf.values().map(|w| w * w).sum::<f64>().sqrt();

            let mut ranked: Vec<(&String, &f64)> = sem.tf_idf.iter().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
            sem.keywords = ranked
                .into_iter()
                .take(MAX_KEYWORDS)
                .map(|(t, _)| t.clone())
                .collect();
        }

        info!("Semantic analysis complete: {} files", semantics.len());
        SemanticIndex { files: semantics }
    }
}

/// Read-only semantic model of one corpus snapshot.
#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    files: BTreeMap<String, FileSemantics>,
}

impl SemanticIndex {
    pub fn get(&self, path: &str) -> Option<&FileSemantics> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = &FileSemantics> {
        self.files.values()
    }

    pub fn cosine_similarity(a: &FileSemantics, b: &FileSemantics) -> f64 {
        if a.norm == 0.0 || b.norm == 0.0 {
            return 0.0;
        }
        let dot: f64 = a
            .tf_idf
            .iter()
            .filter_map(|(term, wa)| b.tf_idf.get(term).map(|wb| wa * wb))
            .sum();
        dot / (a.norm * b.norm)
    }

    pub fn topic_overlap(a: &FileSemantics, b: &FileSemantics) -> f64 {
        if a.topics.is_empty() || b.topics.is_empty() {
            return 0.0;
        }
        let ta: HashSet<&String> = a.topics.iter().collect();
        let tb: HashSet<&String> = b.topics.iter().collect();
        let union = ta.union(&tb).count();
        if union == 0 {
            0.0
        } else {
            ta.intersection(&tb).count() as f64 / union as f64
        }
    }

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        match (self.files.get(a), self.files.get(b)) {
            (Some(a), Some(b)) => Self::cosine_similarity(a, b),
            _ => 0.0,
        }
    }

    /// Strongest outgoing semantic links for `path`.
    pub fn semantic_links(&self, path: &str) -> Vec<SemanticLink> {
        let source = match self.files.get(path) {
            Some(s) => s,
            None => return Vec::new(),
        };
        let mut links: Vec<SemanticLink> = self
            .files
            .values()
            .filter(|other| other.path != path)
            .filter_map(|other| {
                let similarity = Self::cosine_similarity(source, other);
                let topic_overlap = Self::topic_overlap(source, other);
                let score = 0.7 * similarity + 0.3 * topic_overlap;
                (score > LINK_THRESHOLD).then(|| SemanticLink {
                    target: other.path.clone(),
                    similarity,
                    topic_overlap,
                    score,
                })
            })
            .collect();
        links.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.target.cmp(&b.target)));
        links.truncate(MAX_LINKS_PER_FILE);
        links
    }

    /// Greedy single-pass clustering; files with more topics seed first.
    pub fn clusters(&self) -> Vec<Cluster> {
        let mut order: Vec<&FileSemantics> = self.files.values().collect();
        order.sort_by(|a, b| b.topics.len().cmp(&a.topics.len()));

        let mut assigned: HashSet<&str> = HashSet::new();
        let mut clusters = Vec::new();

        for seed in order {
            if !assigned.insert(seed.path.as_str()) {
                continue;
            }
            let mut members = vec![seed.path.clone()];
            for other in self.files.values() {
                if assigned.contains(other.path.as_str()) {
                    continue;
                }
                if Self::cosine_similarity(seed, other) > CLUSTER_THRESHOLD
                    || Self::topic_overlap(seed, other) > CLUSTER_THRESHOLD
                {
                    assigned.insert(other.path.as_str());
                    members.push(other.path.clone());
                }
            }
            if members.len() > 1 {
                clusters.push(Cluster {
                    topic: self.dominant_topic(&members),
                    files: members,
                });
            }
        }

        clusters.sort_by(|a, b| b.files.len().cmp(&a.files.len()));
        clusters
    }

    /// Most frequent topic; ties go to the topic seen first.
    fn dominant_topic(&self, members: &[String]) -> String {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for topic in members
            .iter()
            .filter_map(|m| self.files.get(m))
            .flat_map(|s| s.topics.iter())
        {
            match counts.iter_mut().find(|(t, _)| *t == topic.as_str()) {
                Some((_, count)) => *count += 1,
                None => counts.push((topic.as_str(), 1)),
            }
        }
        let mut best: Option<(&str, usize)> = None;
        for (topic, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((topic, count));
            }
        }
        best.map(|(t, _)| t.to_string()).unwrap_or_else(|| "misc".to_string())
    }

    pub fn doc_links(&self) -> Vec<DocLink> {
        let code: Vec<&FileSemantics> = self
            .files
            .values()
            .filter(|s| s.category == FileCategory::Code)
            .collect();
        let docs = self
            .files
            .values()
            .filter(|s| s.category == FileCategory::Documentation);

        let mut links = Vec::new();
        let mut documented: BTreeSet<&str> = BTreeSet::new();

        for doc in docs {
            let doc_name = doc.stem();
            let vocabulary = doc.term_freq.keys().cloned().collect::<Vec<_>>().join(" ");
            let mut best: Option<(&FileSemantics, f64)> = None;

            for candidate in &code {
                let code_name = candidate.stem();
                let name_match = doc_name.contains(&code_name) || code_name.contains(&doc_name);
                let mentions = candidate
                    .entities
                    .iter()
                    .filter(|e| vocabulary.contains(&e.to_lowercase()))
                    .count();
                let score = if name_match { 0.3 } else { 0.0 }
                    + 0.5 * Self::cosine_similarity(doc, candidate)
                    + mentions.min(5) as f64 * 0.04;
                if score > best.map_or(0.0, |(_, s)| s) {
                    best = Some((*candidate, score));
                }
            }

            match best {
                Some((code_file, score)) if score > DOC_LINK_THRESHOLD => {
                    documented.insert(code_file.path.as_str());
                    links.push(DocLink::DocToCode {
                        doc_file: doc.path.clone(),
                        code_file: code_file.path.clone(),
                        score,
                    });
                }
                _ => links.push(DocLink::DocWithoutCode {
                    doc_file: doc.path.clone(),
                    topic: doc.topics.first().cloned().unwrap_or_else(|| "unknown".to_string()),
                    expected: format!("Code implementing {}", doc_name),
                }),
            }
        }

        for candidate in code {
            if !documented.contains(candidate.path.as_str())
                && candidate.entities.len() > CODE_WITHOUT_DOC_MIN_ENTITIES
            {
                links.push(DocLink::CodeWithoutDoc {
                    code_file: candidate.path.clone(),
                    entities_count: candidate.entities.len(),
                });
            }
        }
        links
    }

    /// Highly similar pairs within one category. Each file appears in at
    /// most one pair.
    pub fn duplicates(&self) -> Vec<DuplicatePair> {
        let files: Vec<&FileSemantics> = self.files.values().collect();
        let mut checked: HashSet<&str> = HashSet::new();
        let mut pairs = Vec::new();

        for (i, first) in files.iter().enumerate() {
            if checked.contains(first.path.as_str()) {
                continue;
            }
            for second in &files[i + 1..] {
                if checked.contains(second.path.as_str()) || first.category != second.category {
                    continue;
                }
                let similarity = Self::cosine_similarity(first, second);
                if similarity > DUPLICATE_THRESHOLD {
                    checked.insert(first.path.as_str());
                    checked.insert(second.path.as_str());
                    pairs.push(DuplicatePair {
                        first: first.path.clone(),
                        second: second.path.clone(),
                        similarity,
                        category: first.category,
                    });
                    break;
                }
            }
        }
        pairs
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let empty = self.files.values().filter(|s| s.keywords.is_empty()).count();
        if empty > 0 {
            warnings.push(format!("Found {} files with no extractable content", empty));
        }

        for sem in self.files.values().filter(|s| s.category == FileCategory::Code) {
            let connected = self
                .files
                .values()
                .any(|other| other.path != sem.path && Self::topic_overlap(sem, other) > ISOLATION_THRESHOLD);
            if !connected {
                warnings.push(format!("File '{}' has no topic overlap with other files", sem.path));
            }
        }
        warnings
    }

    pub fn report(&self) -> SemanticReport {
        SemanticReport {
            total_files: self.files.len(),
            clusters: self.clusters(),
            doc_links: self.doc_links(),
            duplicates: self.duplicates(),
            warnings: self.warnings(),
        }
    }
}
