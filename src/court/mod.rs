//! The adversarial trial: a prosecutor argues for removal, a defense argues
//! for retention, and a judge weighs both sides into a verdict.

pub mod corpus;
pub mod defense;
pub mod evidence;
pub mod git_activity;
pub mod judge;
pub mod prosecutor;
pub mod report;
pub mod trial;

pub use corpus::Corpus;
pub use defense::{DefenseAgent, DefenseCase, DefenseVerdict};
pub use evidence::{Argument, Charge, Evidence, EvidenceCategory, Severity};
pub use git_activity::{FileActivity, GitActivity};
pub use judge::{Decision, JudgeAgent, Reasoning, Verdict};
pub use prosecutor::{ProsecutionCase, ProsecutionVerdict, ProsecutorAgent};
pub use report::{render_text_report, write_reports, CourtReport, CourtSummary, ReportPaths};
pub use trial::{ActionItem, ActionItems, FileCourt, TrialRecord};
