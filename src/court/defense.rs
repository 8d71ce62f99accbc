use super::corpus::Corpus;
use super::evidence::{Argument, Evidence};
use crate::resolver::SourceFile;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;

pub const MAX_CHAIN_DEPTH: usize = 5;
pub const MAX_CHAIN_ENTRIES: usize = 20;

const ENTRY_NAME_TOKENS: &[&str] = &["main", "index", "app", "server", "entry", "cli", "run"];
const IMPORTER_ENTRY_TOKENS: &[&str] = &["main", "index", "app", "server", "entry"];
const CONFIG_NAME_TOKENS: &[&str] = &["env", "options", "rc"];
const CONFIG_NAME_SUBSTRINGS: &[&str] = &[
    "config", "settings", "package.json", "tsconfig", "webpack", "babel", "docker",
];

const IMPORTANT_NAMES: &[(&str, &str)] = &[
    ("auth", "Authentication/Authorization logic"),
    ("security", "Security-related code"),
    ("api", "API definitions"),
    ("gateway", "Service gateway"),
    ("core", "Core functionality"),
    ("base", "Base classes/utilities"),
    ("util", "Utility functions"),
    ("helper", "Helper functions"),
    ("model", "Data models"),
    ("schema", "Data schemas"),
    ("test", "Test files"),
    ("spec", "Specifications"),
];

static CONFIG_CONTENT: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?m)^\s*[A-Z_]+\s*=", r#""[a-z]+"\s*:\s*\{"#, r"(?m)^\s*\[[a-z]+\]"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static INTEGRATION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"requests\.(get|post|put|delete)", "HTTP client - makes API calls"),
        (r"fetch\s*\(", "Fetch API - makes HTTP requests"),
        (r"axios", "Axios client - API integration"),
        (r"websocket|socket\.io", "WebSocket - real-time communication"),
        (r"redis|memcache", "Cache integration"),
        (r"sql|mongodb|postgres|mysql", "Database integration"),
    ]
    .into_iter()
    .map(|(p, d)| (RegexBuilder::new(p).case_insensitive(true).build().unwrap(), d))
    .collect()
});

static CLASS_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^class\s+\w+").unwrap());
static FUNCTION_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(def|function|async\s+function)\s+\w+").unwrap());
static WORK_MARKER: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"(TODO|FIXME|XXX|HACK):")
        .case_insensitive(true)
        .build()
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefenseVerdict {
    Essential,
    Important,
    Useful,
    Marginal,
}

impl DefenseVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefenseVerdict::Essential => "ESSENTIAL",
            DefenseVerdict::Important => "IMPORTANT",
            DefenseVerdict::Useful => "USEFUL",
            DefenseVerdict::Marginal => "MARGINAL",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DefenseCase {
    pub file_path: String,
    pub evidence: Vec<Evidence<Argument>>,
    pub total_strength: f64,
    pub verdict: DefenseVerdict,
    pub confidence: f64,
    pub import_chain: Vec<String>,
    pub referenced_by: Vec<String>,
    pub argument: String,
}

pub fn verdict_for(evidence: &[Evidence<Argument>]) -> (DefenseVerdict, f64) {
    if evidence.is_empty() {
        return (DefenseVerdict::Marginal, 0.3);
    }
    let total: f64 = evidence.iter().map(|e| e.strength).sum();
    let essential = evidence.iter().any(|e| e.category.is_essential());

    if essential || total > 3.0 {
        (DefenseVerdict::Essential, (total / 4.0).min(0.95))
    } else if total > 2.0 {
        (DefenseVerdict::Important, (total / 3.0).min(0.85))
    } else if total > 1.0 {
        (DefenseVerdict::Useful, (total / 2.0).min(0.7))
    } else {
        (DefenseVerdict::Marginal, total.max(0.3))
    }
}

/// Lowercased stem split on `.`, `_` and `-`.
fn name_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| c == '.' || c == '_' || c == '-')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_token(name: &str, tokens: &[&str]) -> bool {
    name_tokens(name).iter().any(|t| tokens.contains(&t.as_str()))
}

fn is_config_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    if CONFIG_NAME_SUBSTRINGS.iter().any(|s| lower.contains(s)) {
        return true;
    }
    if lower.starts_with('.') && lower.trim_end_matches(".json").ends_with("rc") {
        return true;
    }
    if has_token(&lower, CONFIG_NAME_TOKENS) {
        return true;
    }
    matches!(
        lower.rsplit('.').next(),
        Some("yaml") | Some("yml") | Some("toml") | Some("ini")
    )
}

/// Builds the case for keeping a file.
pub struct DefenseAgent<'a> {
    corpus: &'a Corpus,
}

impl<'a> DefenseAgent<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self { corpus }
    }

    pub fn defend(&self, path: &str) -> DefenseCase {
        let mut evidence = Vec::new();
        self.analyze_importers(path, &mut evidence);
        let referenced_by = self.analyze_references(path, &mut evidence);

        if let Some(file) = self.corpus.file(path) {
            analyze_config_role(file, &mut evidence);
            self.analyze_entry_point(file, &mut evidence);
            analyze_documentation(file, &mut evidence);
            self.analyze_activity(path, &mut evidence);
            analyze_naming(file, &mut evidence);
            analyze_content_quality(file, &mut evidence);
            analyze_integration(file, &mut evidence);
            analyze_future_value(file, &mut evidence);
        }

        let (verdict, confidence) = verdict_for(&evidence);
        let total_strength = evidence.iter().map(|e| e.strength).sum();
        let import_chain = self.import_chain(path);
        let argument = build_argument(path, &evidence, verdict);

        DefenseCase {
            file_path: path.to_string(),
            evidence,
            total_strength,
            verdict,
            confidence,
            import_chain,
            referenced_by,
            argument,
        }
    }

    fn is_entry_importer(&self, importer: &str) -> bool {
        let name = importer.rsplit('/').next().unwrap_or(importer);
        self.corpus.is_entry_point(importer) || has_token(name, IMPORTER_ENTRY_TOKENS)
    }

    fn analyze_importers(&self, path: &str, evidence: &mut Vec<Evidence<Argument>>) {
        let importers = self.corpus.graph.dependents(path);
        if importers.is_empty() {
            return;
        }
        let listed: Vec<&String> = importers.iter().take(5).collect();
        evidence.push(
            Evidence::argument(
                Argument::ImportDependency,
                format!("Imported by {} file(s)", importers.len()),
                (importers.len() as f64 * 0.3).min(1.0),
            )
            .with_details(json!({"importers": listed})),
        );

        let entry_importers: Vec<&String> =
            importers.iter().filter(|i| self.is_entry_importer(i)).collect();
        if !entry_importers.is_empty() {
            evidence.push(
                Evidence::argument(
                    Argument::EntryPointDependency,
                    "Required by an application entry point",
                    0.9,
                )
                .with_details(json!({"entry_points": entry_importers})),
            );
        }
    }

    fn analyze_references(&self, path: &str, evidence: &mut Vec<Evidence<Argument>>) -> Vec<String> {
        let mentions: Vec<String> = self.corpus.mentions_of(path).into_iter().map(String::from).collect();
        if mentions.is_empty() {
            return mentions;
        }
        evidence.push(
            Evidence::argument(
                Argument::FileReference,
                format!("Referenced in {} file(s)", mentions.len()),
                (mentions.len() as f64 * 0.2).min(0.8),
            )
            .with_details(json!({"references": mentions.iter().take(5).collect::<Vec<_>>()})),
        );

        let doc_refs: Vec<&String> = mentions
            .iter()
            .filter(|m| {
                let lower = m.to_lowercase();
                lower.ends_with(".md") || lower.ends_with(".rst") || lower.ends_with(".txt")
            })
            .collect();
        if !doc_refs.is_empty() {
            evidence.push(
                Evidence::argument(Argument::Documented, "Mentioned in documentation", 0.6)
                    .with_details(json!({"docs": doc_refs})),
            );
        }
        mentions
    }

    fn analyze_entry_point(&self, file: &SourceFile, evidence: &mut Vec<Evidence<Argument>>) {
        let name = file.file_name();
        if self.corpus.is_entry_point(&file.path)
            || has_token(name, ENTRY_NAME_TOKENS)
            || name == "__init__.py"
            || name == "__main__.py"
        {
            evidence.push(Evidence::argument(
                Argument::EntryPoint,
                "File appears to be an entry point",
                0.9,
            ));
        }

        let content = file.text();
        if content.starts_with("#!") || content.contains("if __name__") {
            evidence.push(Evidence::argument(
                Argument::Executable,
                "File is directly executable",
                0.85,
            ));
        }
    }

    fn analyze_activity(&self, path: &str, evidence: &mut Vec<Evidence<Argument>>) {
        let activity = match self.corpus.git.as_ref().and_then(|g| g.activity(path)) {
            Some(a) => a,
            None => return,
        };
        if activity.commits > 5 {
            evidence.push(Evidence::argument(
                Argument::ActiveDevelopment,
                format!("File has {} commits", activity.commits),
                (activity.commits as f64 / 20.0).min(0.8),
            ));
        }
        if let Some(last) = activity.last_commit {
            evidence.push(Evidence::argument(
                Argument::RecentActivity,
                format!("Last modified {}", last.format("%Y-%m-%d")),
                0.5,
            ));
        }
        if activity.contributors.len() > 1 {
            evidence.push(Evidence::argument(
                Argument::TeamOwnership,
                format!("{} contributors have worked on this file", activity.contributors.len()),
                (activity.contributors.len() as f64 * 0.2).min(0.7),
            ));
        }
    }

    /// Reverse import traversal, rendered as `importer → target` lines
    /// indented by depth.
    pub fn import_chain(&self, path: &str) -> Vec<String> {
        let graph = &self.corpus.graph;
        let mut chain = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([path.to_string()]);
        let mut stack: Vec<(String, String, usize)> = graph
            .dependents(path)
            .into_iter()
            .rev()
            .map(|importer| (importer, path.to_string(), 0))
            .collect();

        while let Some((importer, target, depth)) = stack.pop() {
            if chain.len() >= MAX_CHAIN_ENTRIES {
                break;
            }
            chain.push(format!("{}{} → {}", "  ".repeat(depth), importer, target));
            if depth + 1 <= MAX_CHAIN_DEPTH && visited.insert(importer.clone()) {
                for next in graph.dependents(&importer).into_iter().rev() {
                    stack.push((next, importer.clone(), depth + 1));
                }
            }
        }
        chain
    }
}

fn analyze_config_role(file: &SourceFile, evidence: &mut Vec<Evidence<Argument>>) {
    if is_config_name(file.file_name()) {
        evidence.push(Evidence::argument(
            Argument::ConfigurationFile,
            "Configuration file - required for project setup",
            0.85,
        ));
    }
    let content = file.text();
    if CONFIG_CONTENT.iter().any(|re| re.is_match(content)) {
        evidence.push(Evidence::argument(
            Argument::ConfigContent,
            "Contains configuration definitions",
            0.7,
        ));
    }
}

fn analyze_documentation(file: &SourceFile, evidence: &mut Vec<Evidence<Argument>>) {
    if !matches!(file.extension.as_str(), "md" | "rst" | "txt") {
        return;
    }
    let name = file.file_name().to_lowercase();
    let words = file.text().split_whitespace().count();
    if words > 100 {
        evidence.push(
            Evidence::argument(
                Argument::Documentation,
                format!("Documentation with {} words", words),
                (words as f64 / 1000.0).min(0.8),
            )
            .with_details(json!({"word_count": words})),
        );
    }
    if name.contains("readme") {
        evidence.push(Evidence::argument(
            Argument::Readme,
            "README file - primary project documentation",
            0.95,
        ));
    }
    if name.contains("changelog") {
        evidence.push(Evidence::argument(
            Argument::Changelog,
            "Changelog - tracks project history",
            0.85,
        ));
    }
}

fn analyze_naming(file: &SourceFile, evidence: &mut Vec<Evidence<Argument>>) {
    let name = file.file_name().to_lowercase();
    if let Some((indicator, description)) = IMPORTANT_NAMES.iter().find(|(i, _)| name.contains(i)) {
        evidence.push(
            Evidence::argument(
                Argument::ImportantName,
                format!("File name suggests: {}", description),
                0.6,
            )
            .with_details(json!({"indicator": indicator})),
        );
    }
}

fn analyze_content_quality(file: &SourceFile, evidence: &mut Vec<Evidence<Argument>>) {
    let content = match file.content.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => return,
    };

    let non_empty = content.lines().filter(|l| !l.trim().is_empty()).count();
    if non_empty > 50 {
        evidence.push(Evidence::argument(
            Argument::SubstantialCode,
            format!("File has {} lines of content", non_empty),
            (non_empty as f64 / 200.0).min(0.7),
        ));
    }

    let comment_lines = content
        .lines()
        .map(str::trim)
        .filter(|l| {
            ["#", "//", "/*", "*", "\"\"\"", "'''"]
                .iter()
                .any(|p| l.starts_with(p))
        })
        .count();
    if comment_lines > 10 {
        evidence.push(Evidence::argument(
            Argument::WellDocumented,
            format!("File has {} comment/doc lines", comment_lines),
            (comment_lines as f64 / 50.0).min(0.6),
        ));
    }

    let classes = CLASS_DEF.find_iter(content).count();
    let functions = FUNCTION_DEF.find_iter(content).count();
    if classes + functions > 3 {
        evidence.push(Evidence::argument(
            Argument::StructuredCode,
            format!("Contains {} classes, {} functions", classes, functions),
            ((classes + functions) as f64 / 15.0).min(0.75),
        ));
    }
}

fn analyze_integration(file: &SourceFile, evidence: &mut Vec<Evidence<Argument>>) {
    let content = file.text();
    for (pattern, description) in INTEGRATION_PATTERNS.iter() {
        if pattern.is_match(content) {
            evidence.push(
                Evidence::argument(Argument::Integration, *description, 0.75)
                    .with_details(json!({"pattern": pattern.as_str()})),
            );
        }
    }
}

fn analyze_future_value(file: &SourceFile, evidence: &mut Vec<Evidence<Argument>>) {
    let name = file.file_name().to_lowercase();
    if name.contains("template") || name.contains("example") {
        evidence.push(Evidence::argument(
            Argument::Template,
            "Template/example file - valuable for reference",
            0.65,
        ));
    }
    if name.contains("test") || name.contains("spec") {
        evidence.push(Evidence::argument(
            Argument::TestFile,
            "Test file - essential for code quality",
            0.8,
        ));
    }
    let todos = WORK_MARKER.find_iter(file.text()).count();
    if todos > 0 {
        evidence.push(Evidence::argument(
            Argument::PlannedWork,
            format!("File has {} TODO/FIXME markers - planned improvements", todos),
            0.4,
        ));
    }
}

fn build_argument(path: &str, evidence: &[Evidence<Argument>], verdict: DefenseVerdict) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    if evidence.is_empty() {
        return format!(
            "While '{}' has limited visible dependencies, removing it may have unforeseen consequences. Recommend review before deletion.",
            name
        );
    }

    let mut lines = vec![format!("DEFENSE FOR '{}'", name)];
    lines.push(
        match verdict {
            DefenseVerdict::Essential => "This file is ESSENTIAL to the project.",
            DefenseVerdict::Important => "This file is IMPORTANT and should be retained.",
            DefenseVerdict::Useful => "This file serves useful purposes.",
            DefenseVerdict::Marginal => "This file has some value but limited evidence of active use.",
        }
        .to_string(),
    );

    let strong: Vec<&Evidence<Argument>> = evidence.iter().filter(|e| e.strength >= 0.7).take(3).collect();
    let moderate: Vec<&Evidence<Argument>> = evidence
        .iter()
        .filter(|e| e.strength >= 0.4 && e.strength < 0.7)
        .take(3)
        .collect();
    if !strong.is_empty() {
        lines.push("Strong evidence:".to_string());
        lines.extend(strong.iter().map(|e| format!("  - {}", e.description)));
    }
    if !moderate.is_empty() {
        lines.push("Supporting evidence:".to_string());
        lines.extend(moderate.iter().map(|e| format!("  - {}", e.description)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_names() {
        assert!(is_config_name("settings.py"));
        assert!(is_config_name(".eslintrc.json"));
        assert!(is_config_name("docker-compose.yml"));
        assert!(is_config_name("app.env.example"));
        assert!(!is_config_name("search.py"));
        assert!(!is_config_name("environment_report.md"));
    }

    #[test]
    fn test_entry_tokens_do_not_match_substrings() {
        assert!(has_token("main_window.py", ENTRY_NAME_TOKENS));
        assert!(has_token("app.py", ENTRY_NAME_TOKENS));
        assert!(!has_token("mapper.py", ENTRY_NAME_TOKENS));
        assert!(!has_token("prune.py", ENTRY_NAME_TOKENS));
    }

    #[test]
    fn test_verdict_levels() {
        assert_eq!(verdict_for(&[]), (DefenseVerdict::Marginal, 0.3));

        let useful = vec![
            Evidence::argument(Argument::ImportantName, "a", 0.6),
            Evidence::argument(Argument::PlannedWork, "b", 0.5),
        ];
        assert_eq!(verdict_for(&useful).0, DefenseVerdict::Useful);

        let essential = vec![Evidence::argument(Argument::Readme, "r", 0.95)];
        let (verdict, confidence) = verdict_for(&essential);
        assert_eq!(verdict, DefenseVerdict::Essential);
        assert!((confidence - 0.2375).abs() < 1e-9);
    }

    #[test]
    fn test_commit_history_arguments() {
        use crate::court::git_activity::{FileActivity, GitActivity};
        use crate::resolver::SourceFile;
        use chrono::Utc;
        use std::path::Path;

        let mut git = GitActivity::default();
        git.insert(
            "ledger.py",
            FileActivity {
                commits: 8,
                last_commit: Some(Utc::now()),
                contributors: ["ana".to_string(), "bo".to_string()].into(),
            },
        );
        let files = vec![SourceFile::from_content("ledger.py", "x = 1\n")];
        let corpus = Corpus::from_files(Path::new("."), files, Default::default(), Some(git));

        let case = DefenseAgent::new(&corpus).defend("ledger.py");
        let categories: Vec<Argument> = case.evidence.iter().map(|e| e.category).collect();
        assert!(categories.contains(&Argument::ActiveDevelopment));
        assert!(categories.contains(&Argument::RecentActivity));
        assert!(categories.contains(&Argument::TeamOwnership));
    }
}
