use super::manager::QuarantineManager;
use super::manifest::{now_timestamp, FileRecord};
use std::fmt::Write as _;

/// Markdown status of the quarantine, grouped by session.
pub fn status_report(manager: &QuarantineManager) -> String {
    let summary = manager.summary();
    let files = manager.list(None);
    let mut out = String::new();

    let _ = writeln!(out, "# Quarantine Status Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Generated:** {}", now_timestamp());
    let _ = writeln!(out);
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Total Quarantined | {} |", summary.total_quarantined);
    let _ = writeln!(out, "| Restored | {} |", summary.restored);
    let _ = writeln!(out, "| Deleted | {} |", summary.deleted);
    let _ = writeln!(out, "| Pending Review | {} |", summary.pending);
    let _ = writeln!(out, "| Sessions | {} |", summary.sessions);
    let _ = writeln!(out);

    if files.is_empty() {
        return out;
    }

    let _ = writeln!(out, "## Quarantined Files");
    let _ = writeln!(out);

    // Sessions appear in order of their newest file.
    let mut sessions: Vec<(&str, Vec<(&str, &FileRecord)>)> = Vec::new();
    for (path, record) in files {
        match sessions.iter_mut().find(|(id, _)| *id == record.session_id) {
            Some((_, group)) => group.push((path, record)),
            None => sessions.push((record.session_id.as_str(), vec![(path, record)])),
        }
    }

    for (session_id, group) in sessions {
        let _ = writeln!(out, "### Session: {}", session_id);
        let _ = writeln!(out);
        for (path, record) in group {
            let _ = writeln!(out, "- `{}` - {}", path, record.status());
            for reason in &record.reasons {
                let _ = writeln!(out, "  - {}", reason);
            }
        }
        let _ = writeln!(out);
    }
    out
}
