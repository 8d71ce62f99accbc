use file_court::config::{CourtConfig, Mode};
use file_court::court::prosecutor::score_evidence;
use file_court::court::{
    render_text_report, write_reports, Charge, Corpus, CourtReport, CourtSummary, Decision, DefenseCase, DefenseVerdict,
    Evidence, FileCourt, JudgeAgent, ProsecutionCase, ProsecutionVerdict, Severity,
};
use file_court::resolver::SourceFile;
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;

fn corpus(files: Vec<SourceFile>) -> Corpus {
    let entry_points: BTreeSet<String> = ["main.py".to_string()].into();
    Corpus::from_files(Path::new("."), files, entry_points, None)
}

fn court(files: Vec<SourceFile>) -> FileCourt {
    FileCourt::with_corpus(CourtConfig::new("."), corpus(files))
}

fn billing_repo() -> Vec<SourceFile> {
    vec![
        SourceFile::from_content("main.py", "import billing\n\nbilling.run()\n"),
        SourceFile::from_content(
            "billing.py",
            "def run():\n    return compute_total()\n\ndef compute_total():\n    return 42\n",
        ),
        SourceFile::from_content("billing_old.py", "def old_total():\n    return 1\n"),
    ]
}

fn readme_repo() -> Vec<SourceFile> {
    let mut readme = String::from("# Acme\n\n## Overview\n\n");
    for i in 0..15 {
        readme.push_str(&format!(
            "Acme keeps customer invoices in order and every section {} explains one part of the workflow.\n",
            i
        ));
    }
    let link = "See the [readme](../README.md) for an overview.\n";
    vec![
        SourceFile::from_content("README.md", readme),
        SourceFile::from_content("docs/guide.md", link),
        SourceFile::from_content("docs/faq.md", link),
        SourceFile::from_content("docs/usage.md", link),
    ]
}

fn empty_prosecution(path: &str) -> ProsecutionCase {
    ProsecutionCase {
        file_path: path.to_string(),
        evidence: Vec::new(),
        score: 0.0,
        verdict: ProsecutionVerdict::Keep,
        confidence: 0.3,
        charges: Vec::new(),
        summary: String::new(),
        argument: String::new(),
    }
}

fn empty_defense(path: &str) -> DefenseCase {
    DefenseCase {
        file_path: path.to_string(),
        evidence: Vec::new(),
        total_strength: 0.0,
        verdict: DefenseVerdict::Marginal,
        confidence: 0.3,
        import_chain: Vec::new(),
        referenced_by: Vec::new(),
        argument: String::new(),
    }
}

#[test]
fn test_isolated_obsolete_file_is_quarantined() {
    let court = court(billing_repo());
    let record = court.run_trial("billing_old.py");

    let charges: Vec<Charge> = record.prosecution.evidence.iter().map(|e| e.category).collect();
    assert!(charges.contains(&Charge::Orphan));
    assert!(charges.contains(&Charge::ObsoleteName));
    assert!(charges.contains(&Charge::TinyFile));
    assert_eq!(record.prosecution.verdict, ProsecutionVerdict::Quarantine);

    assert!(record.defense.evidence.is_empty());
    assert_eq!(record.defense.verdict, DefenseVerdict::Marginal);

    assert_eq!(record.verdict.decision, Decision::Quarantine);
    assert_eq!(record.verdict.confidence, 0.95);
    assert_eq!(record.verdict.reasoning.prosecution_weight, 1.0);
}

#[test]
fn test_linked_readme_is_kept() {
    let court = court(readme_repo());
    let record = court.run_trial("README.md");

    assert!(record.prosecution.evidence.is_empty());
    assert_eq!(record.defense.verdict, DefenseVerdict::Essential);
    assert_eq!(record.defense.referenced_by.len(), 3);
    assert_eq!(record.defense.import_chain.len(), 3);

    assert_eq!(record.verdict.decision, Decision::Keep);
    assert_eq!(record.verdict.confidence, 0.95);
}

#[test]
fn test_balanced_empty_cases_need_review() {
    let judge = JudgeAgent::new(Mode::Conservative);
    let verdict = judge.judge(&empty_prosecution("notes.txt"), &empty_defense("notes.txt"));

    assert_eq!(verdict.decision, Decision::ReviewNeeded);
    assert_eq!(verdict.confidence, 0.5);
    assert_eq!(verdict.reasoning.prosecution_weight, 0.5);
    assert_eq!(verdict.reasoning.defense_weight, 0.5);
}

#[test]
fn test_conservative_mode_favours_the_defense() {
    let mut prosecution = empty_prosecution("report.py");
    prosecution.evidence.push(Evidence::new(Charge::TinyFile, "small", Severity::Minor, 0.3));
    let mut defense = empty_defense("report.py");
    defense
        .evidence
        .push(Evidence::argument(file_court::court::Argument::ImportantName, "name", 0.3));

    let conservative = JudgeAgent::new(Mode::Conservative).judge(&prosecution, &defense);
    assert_eq!(conservative.reasoning.defense_weight, 0.535);
    assert_eq!(conservative.reasoning.prosecution_weight, 0.465);

    // Aggressive mode weighs both sides unscaled.
    let aggressive = JudgeAgent::new(Mode::Aggressive).judge(&prosecution, &defense);
    assert_eq!(aggressive.reasoning.prosecution_weight, 0.5);
    assert_eq!(aggressive.reasoning.defense_weight, 0.5);
}

#[test]
fn test_prosecution_score_is_monotonic() {
    let mut evidence = Vec::new();
    let mut previous = score_evidence(&evidence);
    let additions = [
        (Charge::TinyFile, Severity::Minor, 0.3),
        (Charge::ObsoleteName, Severity::Major, 0.7),
        (Charge::StaleDates, Severity::Info, 0.15),
        (Charge::Orphan, Severity::Critical, 0.8),
        (Charge::ExactDuplicate, Severity::Critical, 0.9),
    ];
    for (charge, severity, strength) in additions {
        evidence.push(Evidence::new(charge, "x", severity, strength));
        let score = score_evidence(&evidence);
        assert!(score >= previous, "{} dropped below {}", score, previous);
        assert!(score <= 100.0);
        previous = score;
    }
    assert_eq!(previous, 100.0);
}

#[test]
fn test_convene_only_tries_suspects() {
    let mut court = court(billing_repo());
    let trials = court.convene();

    assert_eq!(trials.len(), 1);
    assert_eq!(trials[0].file_path, "billing_old.py");
    assert_eq!(court.quarantine_list(), vec!["billing_old.py".to_string()]);

    let reasons = court.quarantine_reasons();
    assert!(!reasons["billing_old.py"].is_empty());

    let grouped = court.verdicts_by_decision();
    assert_eq!(grouped.len(), 4);
    assert_eq!(grouped[&Decision::Quarantine], vec!["billing_old.py".to_string()]);
    assert!(grouped[&Decision::Keep].is_empty());

    let actions = court.action_items();
    assert_eq!(actions.immediate.len(), 1);
    assert!(actions.review.is_empty());
    assert!(actions.monitor.is_empty());
}

#[test]
fn test_sequential_and_parallel_agree() {
    let mut parallel = court(billing_repo());
    parallel.convene();

    let mut config = CourtConfig::new(".");
    config.parallel = false;
    let mut sequential = FileCourt::with_corpus(config, corpus(billing_repo()));
    sequential.convene();

    assert_eq!(parallel.verdicts_by_decision(), sequential.verdicts_by_decision());
}

#[test]
fn test_threshold_one_finds_only_certain_suspects() {
    let court = court(billing_repo());
    assert_eq!(court.identify_suspects(1.0), vec!["billing_old.py".to_string()]);
    assert_eq!(court.identify_suspects(0.0).len(), 3);
}

#[test]
fn test_reports() {
    let mut court = court(billing_repo());
    court.convene();

    let text = render_text_report(&court);
    assert!(text.contains("billing_old.py"));
    assert!(text.contains("QUARANTINE"));
    assert!(text.trim_end().ends_with("END OF COURT REPORT"));

    let summary = CourtSummary::from_trials(court.trials());
    assert_eq!(summary.total_cases, 1);
    assert_eq!(summary.high_confidence_decisions, 1);

    let report = CourtReport::build(&court);
    assert_eq!(report.metadata.trials_conducted, 1);
    assert_eq!(report.summary.quarantine, 1);
    assert_eq!(report.repository.node_count, 3);

    let dir = TempDir::new().unwrap();
    let paths = write_reports(&court, dir.path()).unwrap();
    assert!(paths.text.exists());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
    assert_eq!(json["summary"]["quarantine"], 1);
    assert_eq!(json["files_by_verdict"]["QUARANTINE"][0], "billing_old.py");
    let list = std::fs::read_to_string(paths.quarantine_list.unwrap()).unwrap();
    assert_eq!(list.trim(), "billing_old.py");
}

#[test]
fn test_court_reads_repository_from_disk() {
    let dir = TempDir::new().unwrap();
    for file in billing_repo() {
        std::fs::write(dir.path().join(&file.path), file.text()).unwrap();
    }
    let mut config = CourtConfig::new(dir.path());
    config.git.enabled = false;
    let mut court = FileCourt::new(config).unwrap();
    court.convene();

    assert_eq!(court.quarantine_list(), vec!["billing_old.py".to_string()]);
}

#[test]
fn test_missing_repository_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let result = FileCourt::new(CourtConfig::new(dir.path().join("nope")));
    assert!(result.is_err());
}
