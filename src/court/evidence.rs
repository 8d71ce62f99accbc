use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    /// Severity for evidence that only carries a strength.
    pub fn from_strength(strength: f64) -> Self {
        if strength >= 0.8 {
            Severity::Major
        } else if strength >= 0.5 {
            Severity::Minor
        } else {
            Severity::Info
        }
    }
}

/// A category of evidence belonging to exactly one side of a trial.
pub trait EvidenceCategory: Copy + Eq + Hash + Debug + Serialize + Send + Sync {
    fn label(&self) -> &'static str;

    /// Whether the judge counts this category toward the critical bonus.
    fn is_critical(&self) -> bool;
}

/// Charges raised by the prosecution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Charge {
    Orphan,
    Unreferenced,
    LowUsage,
    ExactDuplicate,
    NearDuplicate,
    ObsoleteName,
    AbandonmentMarkers,
    IncompleteImplementation,
    IncompleteMarkers,
    DeadCode,
    CommentedCode,
    EmptyFile,
    TinyFile,
    StaleDates,
    MisplacedTest,
    DeepConfig,
}

impl EvidenceCategory for Charge {
    fn label(&self) -> &'static str {
        match self {
            Charge::Orphan => "orphan",
            Charge::Unreferenced => "unreferenced",
            Charge::LowUsage => "low usage",
            Charge::ExactDuplicate => "exact duplicate",
            Charge::NearDuplicate => "near duplicate",
            Charge::ObsoleteName => "obsolete name",
            Charge::AbandonmentMarkers => "abandonment markers",
            Charge::IncompleteImplementation => "incomplete implementation",
            Charge::IncompleteMarkers => "incomplete markers",
            Charge::DeadCode => "dead code",
            Charge::CommentedCode => "commented-out code",
            Charge::EmptyFile => "empty file",
            Charge::TinyFile => "tiny file",
            Charge::StaleDates => "stale dates",
            Charge::MisplacedTest => "misplaced test",
            Charge::DeepConfig => "deeply nested config",
        }
    }

    fn is_critical(&self) -> bool {
        matches!(
            self,
            Charge::Orphan | Charge::Unreferenced | Charge::ExactDuplicate | Charge::StaleDates
        )
    }
}

/// Arguments raised by the defense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Argument {
    ImportDependency,
    EntryPointDependency,
    FileReference,
    Documented,
    ConfigurationFile,
    ConfigContent,
    EntryPoint,
    Executable,
    Documentation,
    Readme,
    Changelog,
    ActiveDevelopment,
    RecentActivity,
    TeamOwnership,
    ImportantName,
    SubstantialCode,
    WellDocumented,
    StructuredCode,
    Integration,
    Template,
    TestFile,
    PlannedWork,
}

impl Argument {
    /// Categories that make the defense call a file essential.
    pub fn is_essential(&self) -> bool {
        matches!(
            self,
            Argument::ImportDependency
                | Argument::EntryPointDependency
                | Argument::EntryPoint
                | Argument::Readme
                | Argument::ConfigurationFile
                | Argument::TestFile
        )
    }
}

impl EvidenceCategory for Argument {
    fn label(&self) -> &'static str {
        match self {
            Argument::ImportDependency => "import dependency",
            Argument::EntryPointDependency => "entry point dependency",
            Argument::FileReference => "file reference",
            Argument::Documented => "documented",
            Argument::ConfigurationFile => "configuration file",
            Argument::ConfigContent => "configuration content",
            Argument::EntryPoint => "entry point",
            Argument::Executable => "executable",
            Argument::Documentation => "documentation",
            Argument::Readme => "readme",
            Argument::Changelog => "changelog",
            Argument::ActiveDevelopment => "active development",
            Argument::RecentActivity => "recent activity",
            Argument::TeamOwnership => "team ownership",
            Argument::ImportantName => "important name",
            Argument::SubstantialCode => "substantial code",
            Argument::WellDocumented => "well documented",
            Argument::StructuredCode => "structured code",
            Argument::Integration => "integration",
            Argument::Template => "template",
            Argument::TestFile => "test file",
            Argument::PlannedWork => "planned work",
        }
    }

    fn is_critical(&self) -> bool {
        matches!(
            self,
            Argument::ImportDependency
                | Argument::EntryPoint
                | Argument::ConfigurationFile
                | Argument::Integration
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence<C: EvidenceCategory> {
    pub category: C,
    pub description: String,
    pub severity: Severity,
    pub strength: f64,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl<C: EvidenceCategory> Evidence<C> {
    pub fn new(category: C, description: impl Into<String>, severity: Severity, strength: f64) -> Self {
        Self {
            category,
            description: description.into(),
            severity,
            strength,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

impl Evidence<Argument> {
    pub fn argument(category: Argument, description: impl Into<String>, strength: f64) -> Self {
        Self::new(category, description, Severity::from_strength(strength), strength)
    }
}

/// Rounded for presentation, e.g. `round_to(0.12345, 3) == 0.123`.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
