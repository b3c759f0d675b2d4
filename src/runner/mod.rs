//! Cooperative test scheduler.
//!
//! The host calls [`Orchestrator::tick`] on a fixed heartbeat. Each tick admits
//! a batch of queued tests (only once the previous batch has drained), resumes
//! every running test once within the timeslice, enforces timeouts, and emits a
//! [`TestResult`] for every test that finished.

pub mod events;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::context::TestContext;
use crate::fixture::{Abort, Lifecycle};
use crate::models::{Outcome, TestResult};
use crate::registry::{self, Registry, SearchFilter, TestInfo};

pub use events::{DEFAULT_TIMESLICE, RunEvent, RunOptions};

/// What a tick did; the host stops ticking after `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// No run in progress.
    Idle,
    /// Work remains; tick again.
    Continue,
    /// The run just completed and all-complete has fired.
    Finished,
}

pub struct Orchestrator {
    registry: Arc<RwLock<Registry>>,
    queued: VecDeque<String>,
    running: Vec<Lifecycle>,
    stopping: Vec<Lifecycle>,
    results: Vec<TestResult>,
    options: RunOptions,
    active: bool,
    stop_requested: bool,
}

impl Orchestrator {
    pub fn new(registry: Arc<RwLock<Registry>>) -> Self {
        Self {
            registry,
            queued: VecDeque::new(),
            running: Vec::new(),
            stopping: Vec::new(),
            results: Vec::new(),
            options: RunOptions::default(),
            active: false,
            stop_requested: false,
        }
    }

    /// Orchestrator over the process-wide registry.
    pub fn from_global() -> Self {
        Self::new(registry::global())
    }

    pub fn find_tests(&self, filter: &SearchFilter) -> Vec<TestInfo> {
        self.registry.read().find(filter)
    }

    /// Submit a run. Returns false, changing nothing, while another run is active.
    ///
    /// Repeated names are run once. Names unknown to the registry are dropped
    /// with a warning when their turn for admission comes.
    pub fn queue_tests<I, S>(&mut self, names: I, options: RunOptions) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.has_running_tests() {
            warn!("cannot queue tests while a run is in progress");
            return false;
        }

        let mut seen = HashSet::new();
        self.queued = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .filter(|n| seen.insert(n.clone()))
            .collect();
        self.results.clear();
        self.options = options;
        self.active = true;
        self.stop_requested = false;
        info!(count = self.queued.len(), "queued tests");
        true
    }

    pub fn has_running_tests(&self) -> bool {
        self.active
    }

    /// Results emitted so far for the current or most recent run.
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Cancel the run. Pending tests never start; started tests finish Teardown.
    pub fn stop_tests(&mut self) {
        if !self.active || self.stop_requested {
            return;
        }
        self.stop_requested = true;

        let dropped = self.queued.len();
        self.queued.clear();

        for mut lifecycle in self.running.drain(..) {
            let abort = lifecycle.abort_to_teardown();
            if abort == Abort::AlreadyTearingDown {
                lifecycle.context().start_teardown_clock();
            }
            debug!(test = %lifecycle.context().name(), ?abort, "stopping");
            self.stopping.push(lifecycle);
        }
        warn!(
            stopping = self.stopping.len(),
            dropped, "stopping tests"
        );
    }

    /// Advance the run by one heartbeat.
    pub fn tick(&mut self) -> TickStatus {
        if !self.active {
            return TickStatus::Idle;
        }

        if self.running.is_empty() {
            self.admit();
        }
        self.run_step();
        self.sweep_running();
        self.sweep_stopping();

        if self.queued.is_empty() && self.running.is_empty() && self.stopping.is_empty() {
            self.finish();
            return TickStatus::Finished;
        }
        TickStatus::Continue
    }

    /// Move queued tests into Running. Pure tests share a batch; an effectful test
    /// is only admitted into an empty Running set and closes the batch.
    fn admit(&mut self) {
        while let Some(full_name) = self.queued.front().cloned() {
            let factory = self.registry.read().get(&full_name).cloned();
            let Some(factory) = factory else {
                self.queued.pop_front();
                warn!(test = %full_name, "no test registered with this name");
                continue;
            };

            let options = factory.options();
            let skip = options.is_disabled() && !self.options.include_disabled;
            if !skip && !options.is_pure() && !self.running.is_empty() {
                break;
            }
            self.queued.pop_front();

            let name = factory.name().clone();
            self.options.notify_started(&name);

            if skip {
                debug!(test = %name, "disabled, skipping");
                self.complete(TestResult::skipped(name));
                continue;
            }

            let timeout = options.timeout_or_default(factory.kind());
            debug!(test = %name, pure = options.is_pure(), ?timeout, "admitted");
            let cx = TestContext::new(name, timeout);
            self.running.push(Lifecycle::new(factory.build(), cx));

            if !options.is_pure() {
                break;
            }
        }
    }

    fn run_step(&mut self) {
        let started = Instant::now();
        for lifecycle in self.running.iter_mut() {
            let done = lifecycle.resume();
            if self.options.include_timeouts {
                enforce_timeout(lifecycle, done);
            }
            if started.elapsed() > self.options.timeslice {
                debug!(elapsed = ?started.elapsed(), "timeslice exhausted");
                break;
            }
        }
    }

    fn sweep_running(&mut self) {
        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.running)
            .into_iter()
            .partition(Lifecycle::is_done);
        self.running = pending;
        for lifecycle in done {
            self.complete(into_result(&lifecycle, Outcome::from_errors));
        }
    }

    fn sweep_stopping(&mut self) {
        for lifecycle in self.stopping.iter_mut() {
            let done = lifecycle.resume();
            if !done && self.options.include_timeouts {
                enforce_teardown_limit(lifecycle);
            }
        }

        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.stopping)
            .into_iter()
            .partition(Lifecycle::is_done);
        self.stopping = pending;
        for lifecycle in done {
            self.complete(into_result(&lifecycle, Outcome::from_cancelled));
        }
    }

    fn complete(&mut self, result: TestResult) {
        debug!(
            test = %result.name,
            outcome = result.outcome.label(),
            errors = result.errors.len(),
            "test complete"
        );
        self.options.notify_complete(&result);
        self.results.push(result);
    }

    fn finish(&mut self) {
        self.active = false;
        self.stop_requested = false;
        info!(results = self.results.len(), "all tests complete");

        // Dropping the options releases the run's hooks (and any forwarding sender).
        let mut options = std::mem::take(&mut self.options);
        options.notify_all_complete(&self.results);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("queued", &self.queued.len())
            .field("running", &self.running.len())
            .field("stopping", &self.stopping.len())
            .field("results", &self.results.len())
            .field("active", &self.active)
            .finish()
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn enforce_timeout(lifecycle: &mut Lifecycle, done: bool) {
    let cx = lifecycle.context().clone();
    let Some(elapsed) = cx.elapsed() else {
        return;
    };

    if cx.timed_out() {
        if !done {
            enforce_teardown_limit(lifecycle);
        }
        return;
    }

    let budget = cx.timeout();
    if elapsed <= budget {
        return;
    }

    if done {
        cx.add_error(format!(
            "Test finished, but overran timeout limit: {:.2}ms elapsed / {:.2}ms max",
            ms(elapsed),
            ms(budget)
        ));
        return;
    }

    cx.add_error(format!(
        "Timed out at: {:.2}ms elapsed / {:.2}ms max",
        ms(elapsed),
        ms(budget)
    ));
    cx.set_timed_out();
    let abort = lifecycle.abort_to_teardown();
    if abort == Abort::AlreadyTearingDown {
        // Teardown already in flight keeps running under a fresh allowance.
        cx.start_teardown_clock();
    }
    warn!(
        test = %cx.name(),
        elapsed_ms = ms(elapsed),
        budget_ms = ms(budget),
        ?abort,
        "test timed out"
    );
}

/// Teardown gets twice the test's budget, counted from when it began, before
/// it is dropped.
fn enforce_teardown_limit(lifecycle: &mut Lifecycle) {
    let cx = lifecycle.context().clone();
    let Some(elapsed) = cx.teardown_elapsed() else {
        return;
    };
    let limit = cx.timeout() * 2;
    if elapsed > limit {
        cx.add_error(format!(
            "Teardown timed out: {:.2}ms elapsed / {:.2}ms max",
            ms(elapsed),
            ms(limit)
        ));
        lifecycle.kill();
        warn!(test = %cx.name(), "teardown timed out");
    }
}

fn into_result(lifecycle: &Lifecycle, outcome: fn(&[String]) -> Outcome) -> TestResult {
    let cx = lifecycle.context();
    let errors = cx.take_errors();
    TestResult {
        name: cx.name(),
        duration: cx.duration(),
        outcome: outcome(&errors),
        errors,
    }
}
