use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::models::{TestName, TestResult};

/// Default wall-clock budget for resuming tests within one tick.
pub const DEFAULT_TIMESLICE: Duration = Duration::from_millis(8);

/// Notifications streamed out of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    TestStarted { name: TestName },
    TestFinished { result: TestResult },
    RunFinished { results: Vec<TestResult> },
}

type StartedFn = Box<dyn FnMut(&TestName)>;
type CompleteFn = Box<dyn FnMut(&TestResult)>;
type AllCompleteFn = Box<dyn FnMut(&[TestResult])>;

/// Per-run settings and notification hooks. Hooks run synchronously inside
/// [`super::Orchestrator::tick`].
pub struct RunOptions {
    pub include_timeouts: bool,
    pub include_disabled: bool,
    pub timeslice: Duration,
    on_started: Option<StartedFn>,
    on_test_complete: Option<CompleteFn>,
    on_all_complete: Option<AllCompleteFn>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include_timeouts: true,
            include_disabled: false,
            timeslice: DEFAULT_TIMESLICE,
            on_started: None,
            on_test_complete: None,
            on_all_complete: None,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_timeouts(mut self, include: bool) -> Self {
        self.include_timeouts = include;
        self
    }

    pub fn include_disabled(mut self, include: bool) -> Self {
        self.include_disabled = include;
        self
    }

    pub fn timeslice(mut self, timeslice: Duration) -> Self {
        self.timeslice = timeslice;
        self
    }

    pub fn on_started(mut self, f: impl FnMut(&TestName) + 'static) -> Self {
        self.on_started = Some(Box::new(f));
        self
    }

    pub fn on_test_complete(mut self, f: impl FnMut(&TestResult) + 'static) -> Self {
        self.on_test_complete = Some(Box::new(f));
        self
    }

    pub fn on_all_complete(mut self, f: impl FnMut(&[TestResult]) + 'static) -> Self {
        self.on_all_complete = Some(Box::new(f));
        self
    }

    /// Relay every notification over `tx`, replacing any hooks set so far.
    /// The sender is dropped once the run finishes, closing the channel.
    pub fn forward_to(self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        let started = tx.clone();
        let finished = tx.clone();
        self.on_started(move |name| {
            let _ = started.send(RunEvent::TestStarted { name: name.clone() });
        })
        .on_test_complete(move |result| {
            let _ = finished.send(RunEvent::TestFinished {
                result: result.clone(),
            });
        })
        .on_all_complete(move |results| {
            let _ = tx.send(RunEvent::RunFinished {
                results: results.to_vec(),
            });
        })
    }

    pub(crate) fn notify_started(&mut self, name: &TestName) {
        if let Some(f) = self.on_started.as_mut() {
            f(name);
        }
    }

    pub(crate) fn notify_complete(&mut self, result: &TestResult) {
        if let Some(f) = self.on_test_complete.as_mut() {
            f(result);
        }
    }

    pub(crate) fn notify_all_complete(&mut self, results: &[TestResult]) {
        if let Some(f) = self.on_all_complete.as_mut() {
            f(results);
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("include_timeouts", &self.include_timeouts)
            .field("include_disabled", &self.include_disabled)
            .field("timeslice", &self.timeslice)
            .finish_non_exhaustive()
    }
}
