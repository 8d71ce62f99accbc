use super::judge::Decision;
use super::trial::{ActionItems, FileCourt, TrialRecord};
use crate::semantics::SemanticReport;
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const HIGH_CONFIDENCE: f64 = 0.8;
const KEEP_SAMPLE: usize = 10;
const TRANSCRIPT_EVIDENCE: usize = 3;
const MOST_DEPENDED: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub repository: String,
    pub total_files: usize,
    pub trials_conducted: usize,
    pub conservative_mode: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerdictCounts {
    pub keep: usize,
    pub quarantine: usize,
    pub delete: usize,
    pub review_needed: usize,
}

/// The judge's tally over every trial.
#[derive(Debug, Clone, Serialize)]
pub struct CourtSummary {
    pub total_cases: usize,
    pub verdicts: VerdictCounts,
    pub high_confidence_decisions: usize,
    pub files_by_decision: BTreeMap<Decision, Vec<String>>,
}

impl CourtSummary {
    pub fn from_trials(trials: &[TrialRecord]) -> Self {
        let mut verdicts = VerdictCounts::default();
        let mut files_by_decision: BTreeMap<Decision, Vec<String>> =
            Decision::ALL.iter().map(|d| (*d, Vec::new())).collect();
        for trial in trials {
            let decision = trial.verdict.decision;
            match decision {
                Decision::Keep => verdicts.keep += 1,
                Decision::Quarantine => verdicts.quarantine += 1,
                Decision::Delete => verdicts.delete += 1,
                Decision::ReviewNeeded => verdicts.review_needed += 1,
            }
            files_by_decision
                .entry(decision)
                .or_default()
                .push(trial.file_path.clone());
        }
        Self {
            total_cases: trials.len(),
            verdicts,
            high_confidence_decisions: trials
                .iter()
                .filter(|t| t.verdict.confidence >= HIGH_CONFIDENCE)
                .count(),
            files_by_decision,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositorySection {
    pub node_count: usize,
    pub edge_count: usize,
    pub orphaned_files: usize,
    pub circular_dependencies: Vec<Vec<String>>,
    pub most_depended_upon: Vec<(String, usize)>,
    pub semantics: SemanticReport,
}

/// Structured report carrying full per-trial evidence.
#[derive(Debug, Clone, Serialize)]
pub struct CourtReport {
    pub metadata: ReportMetadata,
    pub summary: VerdictCounts,
    pub files_by_verdict: BTreeMap<Decision, Vec<String>>,
    pub action_items: ActionItems,
    pub trials: Vec<TrialRecord>,
    pub repository: RepositorySection,
}

impl CourtReport {
    pub fn build(court: &FileCourt) -> Self {
        let corpus = court.corpus();
        let graph = &corpus.graph;
        let summary = CourtSummary::from_trials(court.trials());

        CourtReport {
            metadata: ReportMetadata {
                generated_at: Local::now().to_rfc3339(),
                repository: corpus.root.display().to_string(),
                total_files: corpus.files().len(),
                trials_conducted: court.trials().len(),
                conservative_mode: court.config().mode == crate::config::Mode::Conservative,
            },
            summary: summary.verdicts,
            files_by_verdict: summary.files_by_decision,
            action_items: court.action_items(),
            trials: court.trials().to_vec(),
            repository: RepositorySection {
                node_count: graph.node_count(),
                edge_count: graph.edge_count(),
                orphaned_files: graph.orphaned_files(&corpus.entry_points).len(),
                circular_dependencies: graph.circular_dependencies(),
                most_depended_upon: graph.most_depended_upon(MOST_DEPENDED),
                semantics: corpus.semantics.report(),
            },
        }
    }
}

fn banner(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", "=".repeat(70));
    let _ = writeln!(out, "  {}", title);
    let _ = writeln!(out, "{}", "=".repeat(70));
}

fn trials_with(court: &FileCourt, decision: Decision) -> impl Iterator<Item = &TrialRecord> {
    court
        .trials()
        .iter()
        .filter(move |t| t.verdict.decision == decision)
}

/// Human-readable court report.
pub fn render_text_report(court: &FileCourt) -> String {
    let corpus = court.corpus();
    let summary = CourtSummary::from_trials(court.trials());
    let counts = &summary.verdicts;
    let mut out = String::new();

    banner(&mut out, "FILE COURT - ADVERSARIAL ANALYSIS REPORT");
    let _ = writeln!(out, "Date:              {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Repository:        {}", corpus.root.display());
    let _ = writeln!(out, "Files analyzed:    {}", corpus.files().len());
    let _ = writeln!(out, "Trials conducted:  {}", court.trials().len());
    let _ = writeln!(out);

    let _ = writeln!(out, "VERDICT SUMMARY");
    let _ = writeln!(out, "  KEEP:           {:4} files", counts.keep);
    let _ = writeln!(out, "  QUARANTINE:     {:4} files", counts.quarantine);
    let _ = writeln!(out, "  DELETE:         {:4} files", counts.delete);
    let _ = writeln!(out, "  REVIEW NEEDED:  {:4} files", counts.review_needed);
    let _ = writeln!(out, "  High confidence decisions: {}", summary.high_confidence_decisions);
    let _ = writeln!(out);

    if counts.quarantine > 0 {
        banner(&mut out, "FILES TO QUARANTINE");
        for trial in trials_with(court, Decision::Quarantine) {
            let _ = writeln!(out, "  [{:3.0}%] {}", trial.verdict.confidence * 100.0, trial.file_path);
            if let Some(factor) = trial.verdict.reasoning.key_factors.first() {
                let _ = writeln!(out, "        -> {}", factor);
            }
        }
        let _ = writeln!(out);
    }

    if counts.delete > 0 {
        banner(&mut out, "FILES TO DELETE");
        for trial in trials_with(court, Decision::Delete) {
            let _ = writeln!(out, "  [{:3.0}%] {}", trial.verdict.confidence * 100.0, trial.file_path);
        }
        let _ = writeln!(out);
    }

    if counts.review_needed > 0 {
        banner(&mut out, "FILES NEEDING MANUAL REVIEW");
        for trial in trials_with(court, Decision::ReviewNeeded) {
            let _ = writeln!(out, "  ! {}", trial.file_path);
            let risk: String = trial.verdict.reasoning.risk_assessment.chars().take(60).collect();
            let _ = writeln!(out, "      Risk: {}", risk);
        }
        let _ = writeln!(out);
    }

    if counts.keep > 0 {
        banner(&mut out, &format!("FILES CONFIRMED SAFE ({} files)", counts.keep));
        let mut kept: Vec<&TrialRecord> = trials_with(court, Decision::Keep).collect();
        kept.sort_by(|a, b| {
            b.verdict
                .reasoning
                .defense_weight
                .total_cmp(&a.verdict.reasoning.defense_weight)
        });
        for trial in kept.iter().take(KEEP_SAMPLE) {
            let _ = writeln!(
                out,
                "  [{:3.0}% defense] {}",
                trial.verdict.reasoning.defense_weight * 100.0,
                trial.file_path
            );
        }
        if kept.len() > KEEP_SAMPLE {
            let _ = writeln!(out, "  ... and {} more files", kept.len() - KEEP_SAMPLE);
        }
        let _ = writeln!(out);
    }

    banner(&mut out, "DETAILED TRIAL TRANSCRIPTS");
    for trial in court.trials().iter().filter(|t| t.verdict.decision != Decision::Keep) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "-".repeat(70));
        let _ = writeln!(out, "FILE: {}", trial.file_path);
        let _ = writeln!(out, "{}", "-".repeat(70));

        let prosecution = &trial.prosecution;
        let _ = writeln!(
            out,
            "PROSECUTION: {} ({:.0}%)",
            prosecution.verdict.as_str(),
            prosecution.confidence * 100.0
        );
        for evidence in prosecution.evidence.iter().take(TRANSCRIPT_EVIDENCE) {
            let _ = writeln!(out, "   * {}", evidence.description);
        }

        let defense = &trial.defense;
        let _ = writeln!(
            out,
            "DEFENSE: {} ({:.0}%)",
            defense.verdict.as_str(),
            defense.confidence * 100.0
        );
        for evidence in defense.evidence.iter().take(TRANSCRIPT_EVIDENCE) {
            let _ = writeln!(out, "   * {}", evidence.description);
        }

        let verdict = &trial.verdict;
        let _ = writeln!(out, "VERDICT: {} ({:.0}%)", verdict.decision, verdict.confidence * 100.0);
        for line in verdict.recommendation.lines() {
            let _ = writeln!(out, "   {}", line.trim());
        }
        for point in &verdict.reasoning.dissenting_points {
            let _ = writeln!(out, "   Dissent: {}", point);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "=".repeat(70));
    let _ = writeln!(out, "END OF COURT REPORT");
    out
}

/// Files written by [`write_reports`].
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub text: PathBuf,
    pub json: PathBuf,
    pub quarantine_list: Option<PathBuf>,
}

/// Write the text report, the structured report and (when non-empty) the
/// quarantine list into `dir`, suffixed with the current timestamp.
pub fn write_reports(court: &FileCourt, dir: &Path) -> io::Result<ReportPaths> {
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

    let text = dir.join(format!("court_report_{}.md", stamp));
    fs::write(&text, render_text_report(court))?;

    let json = dir.join(format!("court_report_{}.json", stamp));
    let file = fs::File::create(&json)?;
    serde_json::to_writer_pretty(io::BufWriter::new(file), &CourtReport::build(court))?;

    let list = court.quarantine_list();
    let quarantine_list = if list.is_empty() {
        None
    } else {
        let path = dir.join(format!("quarantine_list_{}.txt", stamp));
        fs::write(&path, list.join("\n"))?;
        Some(path)
    };

    Ok(ReportPaths {
        text,
        json,
        quarantine_list,
    })
}
