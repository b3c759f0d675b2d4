use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::name::TestName;
use super::status::Outcome;

/// Emitted exactly once per admitted test, when it leaves the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: TestName,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    pub outcome: Outcome,
    pub errors: Vec<String>,
}

impl TestResult {
    /// Result for a disabled test that was never constructed.
    pub fn skipped(name: TestName) -> Self {
        Self {
            name,
            duration: Duration::ZERO,
            outcome: Outcome::Skipped,
            errors: Vec::new(),
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut summary = RunSummary {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.outcome {
                Outcome::Success => summary.passed += 1,
                Outcome::Fail => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
            summary.duration += result.duration;
        }
        summary
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}
