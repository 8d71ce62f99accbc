//! Adversarial file-retention analysis.
//!
//! A repository is read once into a [`court::Corpus`] (dependency graph,
//! semantic index, optional commit history). Each suspicious file is then
//! tried by a prosecutor and a defense, and a judge turns both cases into a
//! [`court::Verdict`]. Files sentenced to removal go through the reversible
//! [`quarantine::QuarantineManager`].

pub mod analysis;
pub mod config;
pub mod court;
pub mod error;
pub mod lang;
pub mod quarantine;
pub mod resolver;
pub mod semantics;
pub mod ui;

pub use config::{CourtConfig, Mode};
pub use court::{Decision, FileCourt, TrialRecord, Verdict};
pub use error::{CourtError, Result};
pub use quarantine::QuarantineManager;
