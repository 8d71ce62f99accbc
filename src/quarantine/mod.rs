//! Reversible removal: files move under `quarantine/<session>/` and a JSON
//! manifest records where each one came from.

pub mod manager;
pub mod manifest;
pub mod report;
pub mod restore_script;

pub use manager::{
    validate_relative, CleanupReport, FileOutcome, QuarantineFailure, QuarantineManager,
    QuarantineSummary,
};
pub use manifest::{FileRecord, QuarantineManifest, SessionRecord, MANIFEST_FILE};
pub use report::status_report;
pub use restore_script::{render_restore_script, RESTORE_SCRIPT};
