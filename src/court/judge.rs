use super::defense::DefenseCase;
use super::evidence::{round_to, Argument, Evidence, EvidenceCategory};
use super::prosecutor::ProsecutionCase;
use crate::config::Mode;
use serde::Serialize;
use std::collections::HashSet;

pub const QUARANTINE_THRESHOLD: f64 = 0.65;
pub const KEEP_THRESHOLD: f64 = 0.55;
pub const REVIEW_THRESHOLD: f64 = 0.15;

const CRITICAL_MULTIPLIER: f64 = 1.5;
const CORROBORATION_MULTIPLIER: f64 = 1.2;
const CONSERVATIVE_MULTIPLIER: f64 = 1.15;
const HIGH_RISK_MULTIPLIER: f64 = 1.25;
const DISSENT_STRENGTH: f64 = 0.7;

/// Names that make removal risky.
pub const HIGH_RISK_PATTERNS: &[&str] = &[
    "auth", "security", "config", "main", "index", "server", "app", "core", "api", "gateway",
    "__init__", "setup", "install", "deploy", "build",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Keep,
    Quarantine,
    Delete,
    ReviewNeeded,
}

impl Decision {
    pub const ALL: [Decision; 4] = [
        Decision::Keep,
        Decision::Quarantine,
        Decision::Delete,
        Decision::ReviewNeeded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Keep => "KEEP",
            Decision::Quarantine => "QUARANTINE",
            Decision::Delete => "DELETE",
            Decision::ReviewNeeded => "REVIEW_NEEDED",
        }
    }

    /// Verdicts that send the file to quarantine.
    pub fn removes_file(&self) -> bool {
        matches!(self, Decision::Quarantine | Decision::Delete)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reasoning {
    pub prosecution_weight: f64,
    pub defense_weight: f64,
    pub key_factors: Vec<String>,
    pub risk_assessment: String,
    pub dissenting_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub file_path: String,
    pub decision: Decision,
    pub confidence: f64,
    pub reasoning: Reasoning,
    pub summary: String,
    pub recommendation: String,
}

pub fn is_high_risk(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    HIGH_RISK_PATTERNS.iter().any(|p| name.contains(p))
}

/// Sum of strengths with critical categories counted 1.5x.
pub fn weigh_evidence<C: EvidenceCategory>(evidence: &[Evidence<C>]) -> f64 {
    evidence
        .iter()
        .map(|e| {
            if e.category.is_critical() {
                e.strength * CRITICAL_MULTIPLIER
            } else {
                e.strength
            }
        })
        .sum()
}

/// Three or more distinct charge categories earn a corroboration bonus.
pub fn prosecution_score(case: &ProsecutionCase) -> f64 {
    let score = weigh_evidence(&case.evidence);
    let categories: HashSet<_> = case.evidence.iter().map(|e| e.category).collect();
    if categories.len() >= 3 {
        score * CORROBORATION_MULTIPLIER
    } else {
        score
    }
}

pub fn defense_score(case: &DefenseCase) -> f64 {
    let mut score = weigh_evidence(&case.evidence);
    if !case.import_chain.is_empty() {
        score += (case.import_chain.len() as f64 * 0.2).min(1.0);
    }
    if !case.referenced_by.is_empty() {
        score += (case.referenced_by.len() as f64 * 0.15).min(0.8);
    }
    score
}

/// Decision table over `d = prosecution_weight - defense_weight`.
pub fn decide(difference: f64, high_risk: bool, has_dissent: bool) -> (Decision, f64) {
    if difference > QUARANTINE_THRESHOLD {
        if high_risk && has_dissent {
            return (Decision::ReviewNeeded, 0.6);
        }
        return (Decision::Quarantine, (0.5 + difference).min(0.95));
    }
    if difference < -KEEP_THRESHOLD {
        return (Decision::Keep, (0.5 + difference.abs()).min(0.95));
    }
    if difference.abs() < REVIEW_THRESHOLD {
        return (Decision::ReviewNeeded, 0.5);
    }
    if difference > 0.0 {
        if high_risk {
            return (Decision::ReviewNeeded, 0.55);
        }
        return (Decision::Quarantine, 0.6 + difference * 0.3);
    }
    (Decision::Keep, 0.6 + difference.abs() * 0.3)
}

/// Weighs both cases and renders the final decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct JudgeAgent {
    mode: Mode,
}

impl JudgeAgent {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub fn judge(&self, prosecution: &ProsecutionCase, defense: &DefenseCase) -> Verdict {
        let path = prosecution.file_path.clone();
        let high_risk = is_high_risk(&path);

        let p_score = prosecution_score(prosecution);
        let mut d_score = defense_score(defense);
        if self.mode == Mode::Conservative {
            d_score *= CONSERVATIVE_MULTIPLIER;
        }
        if high_risk {
            d_score *= HIGH_RISK_MULTIPLIER;
        }

        let total = p_score + d_score;
        let (p_weight, d_weight) = if total > 0.0 {
            (p_score / total, d_score / total)
        } else {
            (0.5, 0.5)
        };

        let dissent = dissenting_points(prosecution, defense, p_weight > d_weight);
        let (decision, confidence) = decide(p_weight - d_weight, high_risk, !dissent.is_empty());

        let reasoning = Reasoning {
            prosecution_weight: round_to(p_weight, 3),
            defense_weight: round_to(d_weight, 3),
            key_factors: key_factors(prosecution, defense),
            risk_assessment: assess_risk(defense, high_risk),
            dissenting_points: dissent,
        };
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();

        Verdict {
            summary: summarize(&name, decision, &reasoning),
            recommendation: recommend(&name, decision, &reasoning),
            file_path: path,
            decision,
            confidence: round_to(confidence, 3),
            reasoning,
        }
    }
}

fn strongest<C: EvidenceCategory>(evidence: &[Evidence<C>]) -> Option<&Evidence<C>> {
    // First item wins ties.
    evidence
        .iter()
        .fold(None, |best: Option<&Evidence<C>>, e| match best {
            Some(b) if b.strength >= e.strength => Some(b),
            _ => Some(e),
        })
}

fn key_factors(prosecution: &ProsecutionCase, defense: &DefenseCase) -> Vec<String> {
    let mut factors = Vec::new();
    if let Some(e) = strongest(&prosecution.evidence) {
        factors.push(format!("Prosecution: {}", e.description));
    }
    if let Some(e) = strongest(&defense.evidence) {
        factors.push(format!("Defense: {}", e.description));
    }
    if !defense.import_chain.is_empty() {
        factors.push(format!("Has {} import dependencies", defense.import_chain.len()));
    }
    factors.truncate(5);
    factors
}

fn dissenting_points(
    prosecution: &ProsecutionCase,
    defense: &DefenseCase,
    prosecution_won: bool,
) -> Vec<String> {
    let points: Vec<String> = if prosecution_won {
        defense
            .evidence
            .iter()
            .filter(|e| e.strength >= DISSENT_STRENGTH)
            .map(|e| format!("Defense: {}", e.description))
            .collect()
    } else {
        prosecution
            .evidence
            .iter()
            .filter(|e| e.strength >= DISSENT_STRENGTH)
            .map(|e| format!("Prosecution: {}", e.description))
            .collect()
    };
    points.into_iter().take(3).collect()
}

fn assess_risk(defense: &DefenseCase, high_risk: bool) -> String {
    let mut risks = Vec::new();
    if high_risk {
        risks.push("HIGH: File name suggests critical functionality".to_string());
    }
    if !defense.import_chain.is_empty() {
        risks.push(format!("MEDIUM: {} files may be affected", defense.import_chain.len()));
    }
    let has = |category: Argument| defense.evidence.iter().any(|e| e.category == category);
    if has(Argument::Integration) {
        risks.push("HIGH: File appears to be an integration point".to_string());
    }
    if has(Argument::EntryPoint) {
        risks.push("CRITICAL: File appears to be an entry point".to_string());
    }
    if risks.is_empty() {
        "LOW: No significant risks identified".to_string()
    } else {
        risks.join(" | ")
    }
}

fn summarize(name: &str, decision: Decision, reasoning: &Reasoning) -> String {
    let mut summary = format!(
        "{}: {} (prosecution {:.0}% | defense {:.0}%)",
        decision,
        name,
        reasoning.prosecution_weight * 100.0,
        reasoning.defense_weight * 100.0
    );
    if let Some(first) = reasoning.key_factors.first() {
        summary.push_str(&format!("\n   Key: {}", first));
    }
    summary
}

fn recommend(name: &str, decision: Decision, reasoning: &Reasoning) -> String {
    match decision {
        Decision::Keep => format!("KEEP {} - defense presented compelling evidence for retention.", name),
        Decision::Quarantine => {
            let mut rec = format!("QUARANTINE {} - move to quarantine for an observation period.", name);
            if let Some(point) = reasoning.dissenting_points.first() {
                rec.push_str(&format!("\n   Note: {}", point));
            }
            rec
        }
        Decision::Delete => format!("DELETE {} - strong evidence of redundancy with no dependencies.", name),
        Decision::ReviewNeeded => format!(
            "REVIEW NEEDED for {} - evidence is inconclusive.\n   Risk: {}\n   Manual inspection recommended before any action.",
            name, reasoning.risk_assessment
        ),
    }
}
