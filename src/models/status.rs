use serde::{Deserialize, Serialize};

/// Final verdict for one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Skipped,
    Success,
    Fail,
}

impl Outcome {
    pub fn icon(&self) -> &'static str {
        match self {
            Outcome::Success => "✔",
            Outcome::Fail => "✘",
            Outcome::Skipped => "⊘",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Fail => "Fail",
            Outcome::Skipped => "Skipped",
        }
    }

    /// Outcome for a test that ran to completion.
    pub fn from_errors(errors: &[String]) -> Self {
        if errors.is_empty() {
            Outcome::Success
        } else {
            Outcome::Fail
        }
    }

    /// Outcome for a test that was cancelled mid-run.
    pub fn from_cancelled(errors: &[String]) -> Self {
        if errors.is_empty() {
            Outcome::Skipped
        } else {
            Outcome::Fail
        }
    }
}
