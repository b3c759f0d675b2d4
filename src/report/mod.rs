//! Run output: log lines, a JSON dump, and the JUnit report in [`junit`].

pub mod junit;

use serde::Serialize;

use crate::models::{Outcome, RunSummary, TestResult};

/// Headline for one finished test. Failures are followed by one line per error.
pub fn summary_line(result: &TestResult) -> String {
    match result.outcome {
        Outcome::Success => format!(
            "{} succeeded ({:.2}ms)",
            result.name,
            result.duration_ms()
        ),
        Outcome::Fail => format!("{} failed. Errors:", result.name),
        Outcome::Skipped => format!("{} skipped", result.name),
    }
}

/// Closing sentence for a run.
pub fn run_sentence(summary: &RunSummary) -> String {
    let succeeded = summary.total - summary.failed;
    if summary.failed == 0 {
        format!(
            "Test run finished. {succeeded} / {} tests succeeded.",
            summary.total
        )
    } else {
        format!(
            "Test run finished. {succeeded} / {} tests succeeded. {} tests failed.",
            summary.total, summary.failed
        )
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: RunSummary,
    results: &'a [TestResult],
}

/// Summary plus every result, as pretty-printed JSON.
pub fn to_json(results: &[TestResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        summary: RunSummary::from_results(results),
        results,
    })
}
