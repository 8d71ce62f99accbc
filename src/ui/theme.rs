use crate::court::Decision;
use colored::*;

/// Console styling for court output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Theme {
    #[default]
    Color,
    Plain,
}

impl Theme {
    pub fn from_flag(no_color: bool) -> Self {
        if no_color {
            Theme::Plain
        } else {
            Theme::Color
        }
    }

    pub fn decision(&self, decision: Decision) -> ColoredString {
        let label = decision.as_str();
        match self {
            Theme::Plain => label.normal(),
            Theme::Color => match decision {
                Decision::Keep => label.green().bold(),
                Decision::Quarantine => label.yellow().bold(),
                Decision::Delete => label.red().bold(),
                Decision::ReviewNeeded => label.cyan().bold(),
            },
        }
    }

    pub fn heading(&self, text: &str) -> ColoredString {
        match self {
            Theme::Plain => text.normal(),
            Theme::Color => text.bold().blue(),
        }
    }

    pub fn success(&self, text: &str) -> ColoredString {
        match self {
            Theme::Plain => text.normal(),
            Theme::Color => text.green(),
        }
    }

    pub fn failure(&self, text: &str) -> ColoredString {
        match self {
            Theme::Plain => text.normal(),
            Theme::Color => text.red(),
        }
    }

    pub fn muted(&self, text: &str) -> ColoredString {
        match self {
            Theme::Plain => text.normal(),
            Theme::Color => text.dimmed(),
        }
    }
}

pub fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}
