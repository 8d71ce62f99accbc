//! Quick relevance scan: one score per file from the dependency graph and
//! semantic links, without running trials.

use crate::court::Corpus;
use crate::resolver::FileCategory;
use crate::semantics::DocLink;
use chrono::Local;
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

const OBSOLETE_MARKERS: &[&str] = &["_old", "_backup", "_copy", ".bak", "_deprecated"];
const LOW_RELEVANCE: f64 = 0.2;
const MIN_CANDIDATE_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Serialize)]
pub struct FileRelevance {
    pub path: String,
    pub category: FileCategory,
    pub imports: usize,
    pub imported_by: usize,
    pub semantic_links: usize,
    pub relevance_score: f64,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub is_orphaned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub path: String,
    pub category: FileCategory,
    pub relevance_score: f64,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inconsistency {
    MissingImplementation {
        doc_file: String,
        expected_code: String,
        description: String,
    },
    MissingDocumentation {
        code_file: String,
        description: String,
    },
}

impl Inconsistency {
    pub fn kind(&self) -> &'static str {
        match self {
            Inconsistency::MissingImplementation { .. } => "missing_implementation",
            Inconsistency::MissingDocumentation { .. } => "missing_documentation",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Inconsistency::MissingImplementation { description, .. }
            | Inconsistency::MissingDocumentation { description, .. } => description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelevanceReport {
    pub generated_at: String,
    pub repository: String,
    pub file_type_counts: BTreeMap<FileCategory, usize>,
    pub orphaned_count: usize,
    pub files: BTreeMap<String, FileRelevance>,
    pub candidates: Vec<Candidate>,
    pub inconsistencies: Vec<Inconsistency>,
    pub most_referenced: Vec<(String, usize)>,
    pub warnings: Vec<String>,
}

fn score_file(corpus: &Corpus, path: &str, category: FileCategory) -> FileRelevance {
    let imports = corpus.graph.dependency_count(path);
    let imported_by = corpus.graph.dependent_count(path);
    let semantic_links = corpus.semantics.semantic_links(path).len();
    let entry_point = corpus.is_entry_point(path);

    let mut score = 0.0;
    let mut confidence: f64 = 0.0;
    let mut factors = Vec::new();

    if entry_point {
        score += 0.4;
        confidence += 0.3;
        factors.push("entry_point".to_string());
    }
    if imported_by > 0 {
        score += (imported_by as f64 * 0.1).min(0.3);
        confidence += 0.2;
        factors.push(format!("imported_by_{}", imported_by));
    }
    if imports > 0 {
        score += (imports as f64 * 0.02).min(0.1);
        factors.push(format!("imports_{}", imports));
    }
    if semantic_links > 0 {
        score += (semantic_links as f64 * 0.05).min(0.2);
        confidence += 0.1;
        factors.push(format!("semantic_links_{}", semantic_links));
    }
    match category {
        FileCategory::Config => {
            score += 0.1;
            factors.push("config_file".to_string());
        }
        FileCategory::Documentation if semantic_links == 0 => {
            score -= 0.1;
            factors.push("unlinked_doc".to_string());
        }
        _ => {}
    }
    let is_orphaned = imported_by == 0 && semantic_links == 0 && !entry_point;
    if is_orphaned {
        score -= 0.2;
        factors.push("orphaned".to_string());
    }

    FileRelevance {
        path: path.to_string(),
        category,
        imports,
        imported_by,
        semantic_links,
        relevance_score: score.clamp(0.0, 1.0),
        // Every file starts from a base confidence of 0.3.
        confidence: (confidence + 0.3).clamp(0.0, 1.0),
        factors,
        is_orphaned,
    }
}

fn candidate_reasons(file: &FileRelevance, duplicates: &BTreeSet<String>) -> Vec<String> {
    let mut reasons = Vec::new();
    if file.is_orphaned {
        reasons.push("Not referenced by any other file (orphaned)".to_string());
    }
    if file.relevance_score < LOW_RELEVANCE && file.confidence > MIN_CANDIDATE_CONFIDENCE {
        reasons.push(format!("Low relevance score ({:.2})", file.relevance_score));
    }
    if duplicates.contains(&file.path) {
        reasons.push("Appears to be a duplicate of another file".to_string());
    }
    let name = file.path.rsplit('/').next().unwrap_or(&file.path).to_lowercase();
    if OBSOLETE_MARKERS.iter().any(|m| name.contains(m)) {
        reasons.push("File name suggests obsolete/backup status".to_string());
    }
    reasons
}

fn inconsistencies(links: &[DocLink]) -> Vec<Inconsistency> {
    links
        .iter()
        .filter_map(|link| match link {
            DocLink::DocWithoutCode {
                doc_file,
                topic,
                expected,
            } => Some(Inconsistency::MissingImplementation {
                doc_file: doc_file.clone(),
                expected_code: expected.clone(),
                description: format!(
                    "Documentation mentions '{}' but no corresponding code found",
                    topic
                ),
            }),
            DocLink::CodeWithoutDoc { code_file, .. } => Some(Inconsistency::MissingDocumentation {
                code_file: code_file.clone(),
                description: format!("{} has no corresponding documentation", code_file),
            }),
            DocLink::DocToCode { .. } => None,
        })
        .collect()
}

/// Score every file, then collect removal candidates and doc/code gaps.
pub fn scan(corpus: &Corpus) -> RelevanceReport {
    let mut files = BTreeMap::new();
    let mut file_type_counts: BTreeMap<FileCategory, usize> = BTreeMap::new();
    for file in corpus.files() {
        *file_type_counts.entry(file.category).or_default() += 1;
        files.insert(file.path.clone(), score_file(corpus, &file.path, file.category));
    }

    let semantic = corpus.semantics.report();
    // The second file of each pair is the one worth questioning.
    let duplicates: BTreeSet<String> = semantic.duplicates.iter().map(|d| d.second.clone()).collect();

    let mut candidates: Vec<Candidate> = files
        .values()
        .filter_map(|file| {
            let reasons = candidate_reasons(file, &duplicates);
            (!reasons.is_empty()).then(|| Candidate {
                path: file.path.clone(),
                category: file.category,
                relevance_score: file.relevance_score,
                confidence: file.confidence,
                reasons,
            })
        })
        .collect();
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then_with(|| a.path.cmp(&b.path)));

    let mut most_referenced: Vec<(String, usize)> = files
        .values()
        .filter(|f| f.imported_by > 0)
        .map(|f| (f.path.clone(), f.imported_by))
        .collect();
    most_referenced.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    most_referenced.truncate(10);

    let orphaned_count = files.values().filter(|f| f.is_orphaned).count();
    info!(
        "Relevance scan: {} files, {} orphaned, {} candidates",
        files.len(),
        orphaned_count,
        candidates.len()
    );

    RelevanceReport {
        generated_at: Local::now().to_rfc3339(),
        repository: corpus.root.display().to_string(),
        file_type_counts,
        orphaned_count,
        files,
        candidates,
        inconsistencies: inconsistencies(&semantic.doc_links),
        most_referenced,
        warnings: semantic.warnings,
    }
}

impl RelevanceReport {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Repository Analysis Report");
        let _ = writeln!(out);
        let _ = writeln!(out, "**Generated:** {}", self.generated_at);
        let _ = writeln!(out, "**Repository:** {}", self.repository);
        let _ = writeln!(out);
        let _ = writeln!(out, "## Summary");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Metric | Value |");
        let _ = writeln!(out, "|--------|-------|");
        let _ = writeln!(out, "| Total Files Analyzed | {} |", self.files.len());
        let _ = writeln!(out, "| Orphaned Files | {} |", self.orphaned_count);
        let _ = writeln!(out, "| Quarantine Candidates | {} |", self.candidates.len());
        let _ = writeln!(out);

        let _ = writeln!(out, "### File Types");
        let _ = writeln!(out);
        for (category, count) in &self.file_type_counts {
            let _ = writeln!(out, "- **{}:** {}", category.as_str(), count);
        }
        let _ = writeln!(out);

        if !self.candidates.is_empty() {
            let _ = writeln!(out, "## Quarantine Recommendations");
            let _ = writeln!(out);
            for candidate in &self.candidates {
                let _ = writeln!(out, "### `{}`", candidate.path);
                let _ = writeln!(out, "- **Type:** {}", candidate.category.as_str());
                let _ = writeln!(out, "- **Relevance Score:** {:.2}", candidate.relevance_score);
                let _ = writeln!(out, "- **Confidence:** {:.2}", candidate.confidence);
                let _ = writeln!(out, "- **Reasons:**");
                for reason in &candidate.reasons {
                    let _ = writeln!(out, "  - {}", reason);
                }
                let _ = writeln!(out);
            }
        }

        let _ = writeln!(out, "## Most Referenced Files");
        let _ = writeln!(out);
        for (path, count) in &self.most_referenced {
            let _ = writeln!(out, "- `{}`: {} references", path, count);
        }
        let _ = writeln!(out);

        if !self.inconsistencies.is_empty() {
            let _ = writeln!(out, "## Inconsistencies Detected");
            let _ = writeln!(out);
            for inconsistency in &self.inconsistencies {
                let _ = writeln!(out, "- **{}:** {}", inconsistency.kind(), inconsistency.description());
            }
            let _ = writeln!(out);
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "## Warnings");
            let _ = writeln!(out);
            for warning in &self.warnings {
                let _ = writeln!(out, "- {}", warning);
            }
        }
        out
    }
}
