use super::corpus::Corpus;
use super::evidence::{round_to, Charge, Evidence, Severity};
use crate::resolver::SourceFile;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

pub const QUARANTINE_SCORE: f64 = 70.0;
pub const REVIEW_SCORE: f64 = 50.0;
const SCORE_SCALE: f64 = 40.0;
const CHARGE_WEIGHT: f64 = 0.3;

fn case_insensitive(patterns: &[&str]) -> Vec<(String, Regex)> {
    patterns
        .iter()
        .map(|p| {
            let regex = RegexBuilder::new(p).case_insensitive(true).build().unwrap();
            (p.to_string(), regex)
        })
        .collect()
}

static OBSOLETE_PATTERNS: Lazy<Vec<(String, Regex)>> = Lazy::new(|| {
    case_insensitive(&[
        r"_old\b",
        r"_backup\b",
        r"_bak\b",
        r"\.bak$",
        r"_copy\b",
        r"_deprecated\b",
        r"_unused\b",
        r"_archive\b",
        r"_legacy\b",
        r"_temp\b",
        r"_tmp\b",
        r"\.tmp$",
        r"_test_old\b",
        r"_v\d+\b",
        r"copy of",
        r"\(\d+\)",
        r"~$",
    ])
});

static ABANDONMENT_MARKERS: Lazy<Vec<(String, Regex)>> = Lazy::new(|| {
    case_insensitive(&[
        r"TODO:\s*delete",
        r"TODO:\s*remove",
        r"FIXME:\s*delete",
        r"DEPRECATED",
        r"DO NOT USE",
        r"OBSOLETE",
        r"LEGACY",
        r"will be removed",
        r"scheduled for deletion",
        r"no longer used",
        r"replaced by",
        r"use .* instead",
        r"moved to",
    ])
});

static INCOMPLETE_MARKERS: Lazy<Vec<(String, Regex)>> = Lazy::new(|| {
    case_insensitive(&[
        r"not implemented",
        r"NotImplementedError",
        r"TODO:",
        r"FIXME:",
        r"XXX:",
        r"HACK:",
        r"pass\s*#",
        r"raise NotImplementedError",
        r"\.\.\.",
        r"stub",
        r"placeholder",
        r"skeleton",
    ])
});

static COMMENTED_CODE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"#.*def\s+\w+",
        r"#.*class\s+\w+",
        r"#.*import\s+",
        r"//.*function\s+",
        r"/\*[\s\S]*?def\s+\w+[\s\S]*?\*/",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static PRIVATE_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"def\s+(\w+)\s*\(").unwrap());
static CALL_SITE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\w+)\s*\(").unwrap());
static OLD_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b20(1[0-9]|20|21|22)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProsecutionVerdict {
    Quarantine,
    ReviewNeeded,
    Keep,
}

impl ProsecutionVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProsecutionVerdict::Quarantine => "QUARANTINE",
            ProsecutionVerdict::ReviewNeeded => "REVIEW_NEEDED",
            ProsecutionVerdict::Keep => "KEEP",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProsecutionCase {
    pub file_path: String,
    pub evidence: Vec<Evidence<Charge>>,
    pub score: f64,
    pub verdict: ProsecutionVerdict,
    pub confidence: f64,
    pub charges: Vec<String>,
    pub summary: String,
    pub argument: String,
}

impl ProsecutionCase {
    /// Sum of positive evidence strengths; what the judge weighs.
    pub fn total_strength(&self) -> f64 {
        self.evidence.iter().map(|e| e.strength.max(0.0)).sum()
    }
}

/// Score = min(100, Σ positive strengths × 40 × severity multiplier),
/// rounded to one decimal.
pub fn score_evidence(evidence: &[Evidence<Charge>]) -> f64 {
    if evidence.is_empty() {
        return 0.0;
    }
    let total: f64 = evidence.iter().map(|e| e.strength.max(0.0)).sum();
    let multiplier = if evidence.iter().any(|e| e.severity == Severity::Critical) {
        1.5
    } else if evidence.iter().any(|e| e.severity == Severity::Major) {
        1.2
    } else {
        1.0
    };
    round_to((total * SCORE_SCALE * multiplier).min(100.0), 1)
}

pub fn verdict_for(score: f64) -> (ProsecutionVerdict, f64) {
    if score >= QUARANTINE_SCORE {
        (ProsecutionVerdict::Quarantine, score / 100.0)
    } else if score >= REVIEW_SCORE {
        (ProsecutionVerdict::ReviewNeeded, score / 100.0)
    } else {
        (ProsecutionVerdict::Keep, (score / 100.0).max(0.3))
    }
}

/// Builds the case for removing a file.
pub struct ProsecutorAgent<'a> {
    corpus: &'a Corpus,
}

impl<'a> ProsecutorAgent<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self { corpus }
    }

    pub fn prosecute(&self, path: &str) -> ProsecutionCase {
        let mut evidence = Vec::new();
        self.check_orphan_status(path, &mut evidence);

        if let Some(file) = self.corpus.file(path) {
            self.check_duplicates(file, &mut evidence);
            check_obsolete_name(file, &mut evidence);
            if let Some(content) = file.content.as_deref() {
                check_abandonment(content, &mut evidence);
                check_incomplete(content, &mut evidence);
                check_dead_code(file, content, &mut evidence);
                check_size(content, &mut evidence);
                check_staleness(content, &mut evidence);
            }
            check_location(file, &mut evidence);
        }

        let score = score_evidence(&evidence);
        let (verdict, confidence) = verdict_for(score);
        let charges = evidence
            .iter()
            .filter(|e| e.strength > CHARGE_WEIGHT)
            .map(|e| e.description.clone())
            .collect();

        let mut case = ProsecutionCase {
            file_path: path.to_string(),
            evidence,
            score,
            verdict,
            confidence,
            charges,
            summary: String::new(),
            argument: String::new(),
        };
        case.summary = build_summary(&case);
        case.argument = build_argument(&case);
        case
    }

    fn check_orphan_status(&self, path: &str, evidence: &mut Vec<Evidence<Charge>>) {
        let graph = &self.corpus.graph;
        let dependents = graph.dependents(path);
        let dependencies = graph.dependency_count(path);

        if dependents.is_empty() && dependencies == 0 {
            evidence.push(
                Evidence::new(
                    Charge::Orphan,
                    "File is completely isolated - no imports and nothing imports it",
                    Severity::Critical,
                    0.8,
                )
                .with_details(json!({"importers": 0, "imports": 0})),
            );
        } else if dependents.is_empty() {
            evidence.push(
                Evidence::new(
                    Charge::Unreferenced,
                    format!("Nothing imports this file (but it imports {} files)", dependencies),
                    Severity::Major,
                    0.6,
                )
                .with_details(json!({"importers": 0, "imports": dependencies})),
            );
        } else if dependents.len() == 1 {
            let importer = dependents.iter().next().cloned().unwrap_or_default();
            evidence.push(
                Evidence::new(
                    Charge::LowUsage,
                    format!("Only imported by 1 file: {}", importer),
                    Severity::Minor,
                    0.2,
                )
                .with_details(json!({"importers": [importer]})),
            );
        }
    }

    fn check_duplicates(&self, file: &SourceFile, evidence: &mut Vec<Evidence<Charge>>) {
        let exact = self.corpus.exact_duplicates(&file.path);
        if !exact.is_empty() {
            evidence.push(
                Evidence::new(
                    Charge::ExactDuplicate,
                    format!("Exact duplicate of: {}", exact.join(", ")),
                    Severity::Critical,
                    0.9,
                )
                .with_details(json!({"duplicates": exact})),
            );
            return;
        }

        let words = match self.corpus.word_set(&file.path) {
            Some(w) if !w.is_empty() => w,
            _ => return,
        };
        let size = file.text().len() as f64;

        for other in self.corpus.files() {
            if other.path == file.path || other.extension != file.extension {
                continue;
            }
            let other_size = other.text().len() as f64;
            if other_size == 0.0 || (size - other_size).abs() / size.max(other_size).max(1.0) >= 0.1 {
                continue;
            }
            let other_words = match self.corpus.word_set(&other.path) {
                Some(w) if !w.is_empty() => w,
                _ => continue,
            };
            let union = words.union(other_words).count();
            let similarity = words.intersection(other_words).count() as f64 / union as f64;
            if similarity > 0.85 {
                evidence.push(
                    Evidence::new(
                        Charge::NearDuplicate,
                        format!("Very similar ({:.0}%) to: {}", similarity * 100.0, other.path),
                        Severity::Major,
                        0.7,
                    )
                    .with_details(json!({"similar_to": other.path, "similarity": round_to(similarity, 3)})),
                );
                break;
            }
        }
    }
}

fn check_obsolete_name(file: &SourceFile, evidence: &mut Vec<Evidence<Charge>>) {
    let name = file.file_name().to_lowercase();
    if let Some((pattern, _)) = OBSOLETE_PATTERNS.iter().find(|(_, re)| re.is_match(&name)) {
        evidence.push(
            Evidence::new(
                Charge::ObsoleteName,
                format!("Filename contains obsolete marker: {}", pattern),
                Severity::Major,
                0.7,
            )
            .with_details(json!({"pattern": pattern, "filename": name})),
        );
    }
}

fn check_abandonment(content: &str, evidence: &mut Vec<Evidence<Charge>>) {
    let found: Vec<&str> = ABANDONMENT_MARKERS
        .iter()
        .flat_map(|(_, re)| re.find_iter(content).take(2).map(|m| m.as_str()))
        .collect();
    if found.is_empty() {
        return;
    }
    evidence.push(
        Evidence::new(
            Charge::AbandonmentMarkers,
            format!("Contains abandonment markers: {}", found[..found.len().min(5)].join(", ")),
            Severity::Major,
            0.6,
        )
        .with_details(json!({"markers": &found[..found.len().min(10)]})),
    );
}

fn check_incomplete(content: &str, evidence: &mut Vec<Evidence<Charge>>) {
    let mut count = 0;
    let mut patterns = Vec::new();
    for (pattern, re) in INCOMPLETE_MARKERS.iter() {
        let hits = re.find_iter(content).count();
        if hits > 0 {
            count += hits;
            patterns.push(pattern.as_str());
        }
    }
    let code_lines = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .count();
    if code_lines == 0 || count == 0 {
        return;
    }

    let ratio = count as f64 / code_lines as f64;
    if ratio > 0.1 {
        evidence.push(
            Evidence::new(
                Charge::IncompleteImplementation,
                format!(
                    "High incomplete marker ratio ({:.1}%): {} markers in {} lines",
                    ratio * 100.0,
                    count,
                    code_lines
                ),
                Severity::Major,
                0.5,
            )
            .with_details(json!({"markers_found": count, "code_lines": code_lines, "patterns": patterns})),
        );
    } else if count > 5 {
        evidence.push(
            Evidence::new(
                Charge::IncompleteMarkers,
                format!("Contains {} TODO/FIXME markers", count),
                Severity::Minor,
                0.2,
            )
            .with_details(json!({"markers_found": count})),
        );
    }
}

fn check_dead_code(file: &SourceFile, content: &str, evidence: &mut Vec<Evidence<Charge>>) {
    if file.extension == "py" {
        // Call-shaped occurrences per name; the `def` line counts as one.
        let mut calls: HashMap<&str, usize> = HashMap::new();
        for caps in CALL_SITE.captures_iter(content) {
            if let Some(name) = caps.get(1) {
                *calls.entry(name.as_str()).or_default() += 1;
            }
        }
        let unused: Vec<String> = PRIVATE_DEF
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .filter(|name| name.starts_with('_') && !name.starts_with("__"))
            .filter(|name| calls.get(name.as_str()).copied().unwrap_or(0) <= 1)
            .collect();
        if unused.len() > 3 {
            evidence.push(
                Evidence::new(
                    Charge::DeadCode,
                    format!("Contains {} potentially unused private functions", unused.len()),
                    Severity::Minor,
                    0.3,
                )
                .with_details(json!({"unused_functions": &unused[..unused.len().min(10)]})),
            );
        }
    }

    let commented: usize = COMMENTED_CODE.iter().map(|re| re.find_iter(content).count()).sum();
    if commented > 5 {
        evidence.push(
            Evidence::new(
                Charge::CommentedCode,
                format!("Contains {} blocks of commented-out code", commented),
                Severity::Minor,
                0.25,
            )
            .with_details(json!({"count": commented})),
        );
    }
}

fn check_size(content: &str, evidence: &mut Vec<Evidence<Charge>>) {
    let lines = content.lines().filter(|l| !l.trim().is_empty()).count();
    if lines == 0 {
        evidence.push(
            Evidence::new(
                Charge::EmptyFile,
                "File is empty or contains only whitespace",
                Severity::Critical,
                0.9,
            )
            .with_details(json!({"lines": 0})),
        );
    } else if lines < 5 {
        evidence.push(
            Evidence::new(
                Charge::TinyFile,
                format!("Very small file with only {} non-empty lines", lines),
                Severity::Minor,
                0.3,
            )
            .with_details(json!({"lines": lines})),
        );
    }
}

fn check_staleness(content: &str, evidence: &mut Vec<Evidence<Charge>>) {
    let years: BTreeSet<&str> = OLD_YEAR.find_iter(content).map(|m| m.as_str()).collect();
    if years.len() > 3 {
        let listed: Vec<&str> = years.iter().take(5).copied().collect();
        evidence.push(
            Evidence::new(
                Charge::StaleDates,
                format!("Contains references to {} old years ({}, ...)", years.len(), listed[0]),
                Severity::Info,
                0.15,
            )
            .with_details(json!({"years_found": listed})),
        );
    }
}

fn check_location(file: &SourceFile, evidence: &mut Vec<Evidence<Charge>>) {
    let name = file.file_name().to_lowercase();
    let parent = file.parent().to_lowercase();

    if name.contains("test") && !parent.contains("test") {
        evidence.push(
            Evidence::new(
                Charge::MisplacedTest,
                "Test file located outside of test directory",
                Severity::Minor,
                0.2,
            )
            .with_details(json!({"location": file.parent()})),
        );
    }

    let depth = Path::new(&file.path).components().count();
    if matches!(file.extension.as_str(), "json" | "yaml" | "yml" | "toml")
        && depth > 4
        && name.contains("config")
    {
        evidence.push(
            Evidence::new(
                Charge::DeepConfig,
                format!("Config file nested {} levels deep", depth),
                Severity::Info,
                0.1,
            )
            .with_details(json!({"depth": depth})),
        );
    }
}

fn build_summary(case: &ProsecutionCase) -> String {
    if case.evidence.is_empty() {
        return "No evidence against this file.".to_string();
    }
    let critical = case.evidence.iter().filter(|e| e.severity == Severity::Critical).count();
    let major = case.evidence.iter().filter(|e| e.severity == Severity::Major).count();

    let mut parts = Vec::new();
    if critical > 0 {
        parts.push(format!("{} CRITICAL issue(s)", critical));
    }
    if major > 0 {
        parts.push(format!("{} major issue(s)", major));
    }
    parts.push(format!("Prosecution score: {}/100", case.score));
    parts.join(" | ")
}

fn build_argument(case: &ProsecutionCase) -> String {
    let name = case.file_path.rsplit('/').next().unwrap_or(&case.file_path);
    if case.evidence.is_empty() {
        return format!("No significant evidence against '{}'.", name);
    }

    let mut lines = vec![format!("PROSECUTION OF '{}'", name)];
    lines.push(
        match case.verdict {
            ProsecutionVerdict::Quarantine => "This file should be QUARANTINED.",
            ProsecutionVerdict::ReviewNeeded => "This file requires REVIEW.",
            ProsecutionVerdict::Keep => "Insufficient evidence for removal.",
        }
        .to_string(),
    );

    for (severity, heading) in [(Severity::Critical, "Critical issues:"), (Severity::Major, "Major issues:")] {
        let items: Vec<&Evidence<Charge>> =
            case.evidence.iter().filter(|e| e.severity == severity).take(3).collect();
        if !items.is_empty() {
            lines.push(heading.to_string());
            lines.extend(items.iter().map(|e| format!("  - {}", e.description)));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge(severity: Severity, strength: f64) -> Evidence<Charge> {
        Evidence::new(Charge::TinyFile, "x", severity, strength)
    }

    #[test]
    fn test_score_multipliers() {
        assert_eq!(score_evidence(&[]), 0.0);
        assert_eq!(score_evidence(&[charge(Severity::Minor, 0.3)]), 12.0);
        assert_eq!(score_evidence(&[charge(Severity::Major, 0.5)]), 24.0);
        assert_eq!(score_evidence(&[charge(Severity::Critical, 0.8), charge(Severity::Major, 0.7)]), 90.0);
        assert_eq!(score_evidence(&[charge(Severity::Critical, 0.9), charge(Severity::Critical, 0.9)]), 100.0);
    }

    #[test]
    fn test_negative_strength_is_ignored() {
        assert_eq!(score_evidence(&[charge(Severity::Minor, -1.0), charge(Severity::Minor, 0.5)]), 20.0);
    }

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(verdict_for(70.0).0, ProsecutionVerdict::Quarantine);
        assert_eq!(verdict_for(69.9).0, ProsecutionVerdict::ReviewNeeded);
        assert_eq!(verdict_for(50.0).0, ProsecutionVerdict::ReviewNeeded);
        let (verdict, confidence) = verdict_for(10.0);
        assert_eq!(verdict, ProsecutionVerdict::Keep);
        assert_eq!(confidence, 0.3);
    }

    #[test]
    fn test_obsolete_names() {
        for name in ["legacy_util_old.py", "report_v2.js", "Copy of notes.md", "draft (1).md", "api.py.bak"] {
            let mut evidence = Vec::new();
            check_obsolete_name(&SourceFile::from_content(name, ""), &mut evidence);
            assert_eq!(evidence.len(), 1, "{} should look obsolete", name);
        }
        let mut evidence = Vec::new();
        check_obsolete_name(&SourceFile::from_content("golden.py", ""), &mut evidence);
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_size_checks() {
        let mut evidence = Vec::new();
        check_size("  \n\n", &mut evidence);
        assert_eq!(evidence[0].category, Charge::EmptyFile);
        assert_eq!(evidence[0].severity, Severity::Critical);

        let mut evidence = Vec::new();
        check_size("a\nb\n", &mut evidence);
        assert_eq!(evidence[0].category, Charge::TinyFile);
    }

    #[test]
    fn test_staleness_counts_distinct_years() {
        let mut evidence = Vec::new();
        check_staleness("2015 2015 2015 2015 2015", &mut evidence);
        assert!(evidence.is_empty());
        check_staleness("2012 2015 2019 2021", &mut evidence);
        assert_eq!(evidence[0].category, Charge::StaleDates);
    }

    #[test]
    fn test_dead_private_functions() {
        let content = "def _a():\n    pass\ndef _b():\n    pass\ndef _c():\n    pass\ndef _d():\n    pass\ndef __init__(self):\n    pass\n";
        let mut evidence = Vec::new();
        check_dead_code(&SourceFile::from_content("m.py", content), content, &mut evidence);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].category, Charge::DeadCode);
    }

    #[test]
    fn test_called_private_functions_are_alive() {
        let content = "def _a():\n    return _b()\ndef _b():\n    return _c ()\ndef _c():\n    return self._d()\ndef _d():\n    pass\ndef _e():\n    pass\n";
        let mut evidence = Vec::new();
        check_dead_code(&SourceFile::from_content("m.py", content), content, &mut evidence);
        // Only `_a` and `_e` are never called.
        assert!(evidence.is_empty());
    }
}
