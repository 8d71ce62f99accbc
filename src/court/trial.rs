use super::corpus::Corpus;
use super::defense::{DefenseAgent, DefenseCase};
use super::judge::{Decision, JudgeAgent, Verdict};
use super::prosecutor::{ProsecutionCase, ProsecutorAgent};
use crate::config::CourtConfig;
use crate::error::Result;
use crate::ui::progress::progress_bar;
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

const IMMEDIATE_CONFIDENCE: f64 = 0.8;
const MONITOR_CONFIDENCE: f64 = 0.7;

/// Everything said and decided about one file.
#[derive(Debug, Clone, Serialize)]
pub struct TrialRecord {
    pub file_path: String,
    pub prosecution: ProsecutionCase,
    pub defense: DefenseCase,
    pub verdict: Verdict,
    pub trial_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionItem {
    pub file: String,
    pub decision: Decision,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionItems {
    /// Confident QUARANTINE or DELETE verdicts.
    pub immediate: Vec<ActionItem>,
    pub review: Vec<ActionItem>,
    /// Files kept on weak grounds.
    pub monitor: Vec<ActionItem>,
}

/// Orchestrates screening, trials and aggregation over one corpus.
pub struct FileCourt {
    config: CourtConfig,
    corpus: Corpus,
    judge: JudgeAgent,
    trials: Vec<TrialRecord>,
    show_progress: bool,
}

impl FileCourt {
    pub fn new(config: CourtConfig) -> Result<Self> {
        let corpus = Corpus::build(&config)?;
        Ok(Self::with_corpus(config, corpus))
    }

    pub fn with_corpus(config: CourtConfig, corpus: Corpus) -> Self {
        info!(
            "File court initialized for {} ({} files, {:?} mode)",
            corpus.root.display(),
            corpus.files().len(),
            config.mode
        );
        Self {
            judge: JudgeAgent::new(config.mode),
            config,
            corpus,
            trials: Vec::new(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &CourtConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// Prosecutor-only screening. A file whose prosecution confidence
    /// reaches `threshold` is a suspect.
    pub fn identify_suspects(&self, threshold: f64) -> Vec<String> {
        let prosecutor = ProsecutorAgent::new(&self.corpus);
        let paths: Vec<&str> = self.corpus.files().iter().map(|f| f.path.as_str()).collect();
        let bar = progress_bar(paths.len(), "Screening", self.show_progress);

        let screen = |path: &&str| {
            let case = prosecutor.prosecute(path);
            bar.inc(1);
            if case.confidence >= threshold {
                debug!("Suspect {}: {} ({:.2})", path, case.verdict.as_str(), case.confidence);
                Some(path.to_string())
            } else {
                None
            }
        };
        let suspects: Vec<String> = if self.config.parallel {
            paths.par_iter().filter_map(screen).collect()
        } else {
            paths.iter().filter_map(screen).collect()
        };
        bar.finish_and_clear();

        info!("{} suspects identified for full trial", suspects.len());
        suspects
    }

    /// Prosecution, then defense, then judgment for one file.
    pub fn run_trial(&self, path: &str) -> TrialRecord {
        let started = Instant::now();
        let prosecution = ProsecutorAgent::new(&self.corpus).prosecute(path);
        let defense = DefenseAgent::new(&self.corpus).defend(path);
        let verdict = self.judge.judge(&prosecution, &defense);
        debug!("Trial {}: {} ({:.2})", path, verdict.decision, verdict.confidence);

        TrialRecord {
            file_path: path.to_string(),
            prosecution,
            defense,
            verdict,
            trial_duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Try every suspect. Records replace those of any earlier run and keep
    /// the order of `suspects`.
    pub fn run_all_trials(&mut self, suspects: &[String]) -> &[TrialRecord] {
        let bar = progress_bar(suspects.len(), "Trials", self.show_progress);
        let trial = |path: &String| {
            let record = self.run_trial(path);
            bar.inc(1);
            record
        };
        let records: Vec<TrialRecord> = if self.config.parallel {
            suspects.par_iter().map(trial).collect()
        } else {
            suspects.iter().map(trial).collect()
        };
        bar.finish_and_clear();

        info!("Court adjourned after {} trials", records.len());
        self.trials = records;
        &self.trials
    }

    /// Screen with the configured threshold and try every suspect.
    pub fn convene(&mut self) -> &[TrialRecord] {
        let suspects = self.identify_suspects(self.config.suspicion_threshold);
        self.run_all_trials(&suspects)
    }

    /// Trial paths grouped by decision. Every decision is present.
    pub fn verdicts_by_decision(&self) -> BTreeMap<Decision, Vec<String>> {
        let mut grouped: BTreeMap<Decision, Vec<String>> =
            Decision::ALL.iter().map(|d| (*d, Vec::new())).collect();
        for trial in &self.trials {
            grouped
                .entry(trial.verdict.decision)
                .or_default()
                .push(trial.file_path.clone());
        }
        grouped
    }

    /// Files recommended for removal: QUARANTINE and DELETE verdicts.
    pub fn quarantine_list(&self) -> Vec<String> {
        self.trials
            .iter()
            .filter(|t| t.verdict.decision.removes_file())
            .map(|t| t.file_path.clone())
            .collect()
    }

    /// Key factors of each removal verdict, keyed by path.
    pub fn quarantine_reasons(&self) -> BTreeMap<String, Vec<String>> {
        self.trials
            .iter()
            .filter(|t| t.verdict.decision.removes_file())
            .map(|t| (t.file_path.clone(), t.verdict.reasoning.key_factors.clone()))
            .collect()
    }

    pub fn action_items(&self) -> ActionItems {
        let mut actions = ActionItems::default();
        for trial in &self.trials {
            let verdict = &trial.verdict;
            let item = ActionItem {
                file: trial.file_path.clone(),
                decision: verdict.decision,
                confidence: verdict.confidence,
                reasoning: verdict.reasoning.key_factors.iter().take(2).cloned().collect(),
            };
            match verdict.decision {
                Decision::Quarantine | Decision::Delete if verdict.confidence >= IMMEDIATE_CONFIDENCE => {
                    actions.immediate.push(item)
                }
                Decision::ReviewNeeded | Decision::Quarantine => actions.review.push(item),
                Decision::Keep if verdict.confidence < MONITOR_CONFIDENCE => actions.monitor.push(item),
                _ => {}
            }
        }
        actions
    }
}
