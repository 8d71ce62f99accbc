use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn sample_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("main.py"), "import billing\n\nbilling.run()\n").unwrap();
    fs::write(
        root.join("billing.py"),
        "def run():\n    return compute_total()\n\ndef compute_total():\n    return 42\n",
    )
    .unwrap();
    fs::write(root.join("billing_old.py"), "def old_total():\n    return 1\n").unwrap();
    dir
}

fn file_court() -> Command {
    let mut cmd = Command::cargo_bin("file-court").unwrap();
    cmd.arg("--no-color").env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_graph_lists_orphans() {
    let repo = sample_repo();
    file_court()
        .arg("graph")
        .arg(repo.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Orphaned files (1)"))
        .stdout(predicate::str::contains("billing_old.py"));
}

#[test]
fn test_graph_dot_output() {
    let repo = sample_repo();
    file_court()
        .args(["graph", "--dot"])
        .arg(repo.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph Dependencies {"))
        .stdout(predicate::str::contains("\"main.py\" -> \"billing.py\";"));
}

#[test]
fn test_semantics_json() {
    let repo = sample_repo();
    let output = file_court()
        .args(["semantics", "--json"])
        .arg(repo.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_files"], 3);
}

#[test]
fn test_scan_writes_report() {
    let repo = sample_repo();
    let out = repo.path().join("relevance.md");
    file_court()
        .arg("scan")
        .arg(repo.path())
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));
    let markdown = fs::read_to_string(out).unwrap();
    assert!(markdown.contains("billing_old.py"));
}

#[test]
fn test_analyze_json_report() {
    let repo = sample_repo();
    let output = file_court()
        .args(["analyze", "--json", "--no-git"])
        .arg(repo.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["metadata"]["trials_conducted"], 1);
    assert_eq!(report["summary"]["quarantine"], 1);
    assert_eq!(report["trials"][0]["verdict"]["decision"], "QUARANTINE");
    // Analysis alone never moves files.
    assert!(repo.path().join("billing_old.py").is_file());
}

#[test]
fn test_analyze_text_report() {
    let repo = sample_repo();
    file_court()
        .args(["analyze", "--no-git"])
        .arg(repo.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("END OF COURT REPORT"))
        .stdout(predicate::str::contains("COURT ADJOURNED"))
        .stdout(predicate::str::contains("Quarantine: 1"));
}

#[test]
fn test_analyze_dry_run_quarantine() {
    let repo = sample_repo();
    file_court()
        .args(["analyze", "--no-git", "--quarantine", "--dry-run"])
        .arg(repo.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Would quarantine 1/1 files"));
    assert!(repo.path().join("billing_old.py").is_file());
    assert!(!repo.path().join("quarantine").exists());
}

#[test]
fn test_quarantine_round_trip_through_cli() {
    let repo = sample_repo();
    let root = repo.path();
    file_court()
        .args(["analyze", "--no-git", "--quarantine", "--yes", "--session", "cli1"])
        .arg(root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Quarantined 1/1 files"));
    assert!(root.join("quarantine/cli1/billing_old.py").is_file());

    file_court()
        .args(["quarantine", "--repo"])
        .arg(root)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[pending] billing_old.py (session: cli1)"));

    file_court()
        .args(["quarantine", "--repo"])
        .arg(root)
        .args(["restore-session", "cli1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1/1 files"));
    assert!(root.join("billing_old.py").is_file());
}

#[test]
fn test_empty_quarantine_list() {
    let repo = sample_repo();
    file_court()
        .args(["quarantine", "--repo"])
        .arg(repo.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No quarantined files."));
}

#[test]
fn test_missing_repository_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");
    file_court()
        .arg("graph")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    file_court()
        .args(["quarantine", "--repo"])
        .arg(&missing)
        .arg("summary")
        .assert()
        .failure();
}
