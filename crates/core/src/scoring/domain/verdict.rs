use std::fmt;

use crate::shared::constants::PRONUNCIATION_THRESHOLD;

/// Pass/fail judgement shown to the learner for an accuracy score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    TryAgain,
}

impl Verdict {
    pub fn from_accuracy(accuracy: f64) -> Self {
        Self::with_threshold(accuracy, PRONUNCIATION_THRESHOLD)
    }

    pub fn with_threshold(accuracy: f64, threshold: f64) -> Self {
        if accuracy >= threshold {
            Verdict::Correct
        } else {
            Verdict::TryAgain
        }
    }

    pub fn is_correct(self) -> bool {
        self == Verdict::Correct
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Correct => write!(f, "Correct!"),
            Verdict::TryAgain => write!(f, "Try again"),
        }
    }
}

/// Accuracy as a percentage with one decimal, e.g. `66.7%`.
pub fn format_percent(accuracy: f64) -> String {
    format!("{:.1}%", accuracy * 100.0)
}
