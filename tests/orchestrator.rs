use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use pretty_assertions::assert_eq;

use untested::task::{suspend, wait_for, wait_ticks};
use untested::{
    Fixture, Orchestrator, Outcome, Registry, RunOptions, TestContext, TestFactory, TestFlags,
    TestKind, TestName, TestOptions, TestResult, TickStatus, expect_eq, require_eq,
};

type Journal = Arc<Mutex<Vec<String>>>;

fn name(full: &str) -> TestName {
    TestName::parse(full).unwrap()
}

fn orchestrator(factories: Vec<TestFactory>) -> Orchestrator {
    let mut registry = Registry::new();
    for factory in factories {
        registry.register(factory).unwrap();
    }
    Orchestrator::new(Arc::new(RwLock::new(registry)))
}

/// Unit test that suspends `ticks` times and logs entry into Run.
fn logged(full: &str, options: TestOptions, ticks: usize, journal: &Journal) -> TestFactory {
    let journal = Arc::clone(journal);
    let label = full.to_string();
    TestFactory::unit_fn(name(full), options, move |_cx| {
        journal.lock().unwrap().push(format!("run {label}"));
        async move {
            wait_ticks(ticks).await;
        }
    })
}

fn run_to_end(orchestrator: &mut Orchestrator) -> Vec<TestResult> {
    let mut ticks = 0;
    while orchestrator.tick() == TickStatus::Continue {
        ticks += 1;
        assert!(ticks < 10_000, "run did not finish");
        std::thread::sleep(Duration::from_millis(1));
    }
    orchestrator.results().to_vec()
}

fn by_name<'a>(results: &'a [TestResult], full: &str) -> &'a TestResult {
    results
        .iter()
        .find(|r| r.name.full() == full)
        .unwrap_or_else(|| panic!("no result for {full}"))
}

#[test]
fn passing_and_failing_assertions_decide_the_outcome() {
    let mut orchestrator = orchestrator(vec![
        TestFactory::unit_fn(name("M.C.A"), TestOptions::default(), |cx| async move {
            require_eq!(cx, 1, 1);
        }),
        TestFactory::unit_fn(name("M.C.B"), TestOptions::default(), |cx| async move {
            require_eq!(cx, 1, 2);
        }),
    ]);

    assert!(orchestrator.queue_tests(["M.C.A", "M.C.B"], RunOptions::new()));
    let results = run_to_end(&mut orchestrator);

    assert_eq!(results.len(), 2);
    let a = by_name(&results, "M.C.A");
    assert_eq!(a.outcome, Outcome::Success);
    assert!(a.errors.is_empty());

    let b = by_name(&results, "M.C.B");
    assert_eq!(b.outcome, Outcome::Fail);
    assert_eq!(b.errors.len(), 1);
    assert!(b.errors[0].contains("1 == 2"), "{}", b.errors[0]);
}

#[test]
fn notifications_follow_submission_order() {
    let journal: Journal = Arc::default();
    let mut orchestrator = orchestrator(vec![
        logged("M.C.First", TestOptions::default(), 1, &journal),
        logged("M.C.Second", TestOptions::default(), 0, &journal),
        logged("M.C.Third", TestOptions::default(), 2, &journal),
    ]);

    let events = Rc::new(RefCell::new(Vec::new()));
    let (started, completed, all) = (Rc::clone(&events), Rc::clone(&events), Rc::clone(&events));
    let options = RunOptions::new()
        .on_started(move |n| started.borrow_mut().push(format!("start {}", n.test)))
        .on_test_complete(move |r| completed.borrow_mut().push(format!("done {}", r.name.test)))
        .on_all_complete(move |rs| all.borrow_mut().push(format!("all {}", rs.len())));

    orchestrator.queue_tests(["M.C.First", "M.C.Second", "M.C.Third"], options);
    run_to_end(&mut orchestrator);

    assert_eq!(
        *events.borrow(),
        vec![
            "start First",
            "done First",
            "start Second",
            "done Second",
            "start Third",
            "done Third",
            "all 3",
        ]
    );
}

#[test]
fn pure_tests_share_a_batch_and_effectful_tests_run_alone() {
    let journal: Journal = Arc::default();
    let mut orchestrator = orchestrator(vec![
        logged("M.C.PureA", TestOptions::pure(), 1, &journal),
        logged("M.C.PureB", TestOptions::pure(), 1, &journal),
        logged("M.C.Effect", TestOptions::default(), 0, &journal),
    ]);
    orchestrator.queue_tests(["M.C.PureA", "M.C.PureB", "M.C.Effect"], RunOptions::new());

    assert_eq!(orchestrator.tick(), TickStatus::Continue);
    assert_eq!(*journal.lock().unwrap(), vec!["run M.C.PureA", "run M.C.PureB"]);
    assert!(orchestrator.results().is_empty());

    // Both pure tests finish; Running drains before the effectful test is admitted.
    assert_eq!(orchestrator.tick(), TickStatus::Continue);
    assert_eq!(orchestrator.results().len(), 2);
    assert_eq!(journal.lock().unwrap().len(), 2);

    assert_eq!(orchestrator.tick(), TickStatus::Finished);
    assert_eq!(journal.lock().unwrap().last().unwrap(), "run M.C.Effect");
    assert_eq!(orchestrator.results().len(), 3);
}

#[test]
fn effectful_test_closes_the_batch() {
    let journal: Journal = Arc::default();
    let mut orchestrator = orchestrator(vec![
        logged("M.C.Effect", TestOptions::default(), 1, &journal),
        logged("M.C.Pure", TestOptions::pure(), 0, &journal),
    ]);
    orchestrator.queue_tests(["M.C.Effect", "M.C.Pure"], RunOptions::new());

    orchestrator.tick();
    assert_eq!(*journal.lock().unwrap(), vec!["run M.C.Effect"]);
    run_to_end(&mut orchestrator);
    assert_eq!(
        *journal.lock().unwrap(),
        vec!["run M.C.Effect", "run M.C.Pure"]
    );
}

#[test]
fn disabled_tests_are_skipped_unless_included() {
    let journal: Journal = Arc::default();
    let factories = || {
        vec![
            logged("M.C.Off", TestOptions::disabled(), 0, &journal),
            logged(
                "M.C.OffPure",
                TestOptions::flags(TestFlags::DISABLED | TestFlags::PURE),
                0,
                &journal,
            ),
        ]
    };

    let mut skipping = orchestrator(factories());
    skipping.queue_tests(["M.C.Off", "M.C.OffPure"], RunOptions::new());
    let results = run_to_end(&mut skipping);
    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.outcome, Outcome::Skipped);
        assert!(result.errors.is_empty());
        assert_eq!(result.duration, Duration::ZERO);
    }
    assert!(journal.lock().unwrap().is_empty());

    let mut including = orchestrator(factories());
    including.queue_tests(
        ["M.C.Off", "M.C.OffPure"],
        RunOptions::new().include_disabled(true),
    );
    let results = run_to_end(&mut including);
    assert!(results.iter().all(|r| r.outcome == Outcome::Success));
    assert_eq!(journal.lock().unwrap().len(), 2);
}

#[test]
fn suspending_within_budget_succeeds() {
    let mut orchestrator = orchestrator(vec![TestFactory::unit_fn(
        name("M.C.Quick"),
        TestOptions::pure(),
        |_cx| async {
            suspend().await;
        },
    )]);
    orchestrator.queue_tests(["M.C.Quick"], RunOptions::new());
    let results = run_to_end(&mut orchestrator);

    assert_eq!(results[0].outcome, Outcome::Success);
    assert!(results[0].duration < TestKind::Unit.default_timeout());
}

/// Logs every hook so teardown can be counted.
struct Tracked {
    journal: Journal,
    run_for: Duration,
}

#[async_trait(?Send)]
impl Fixture for Tracked {
    async fn setup(&mut self, _cx: &TestContext) {
        self.journal.lock().unwrap().push("setup".into());
    }

    async fn run(&mut self, _cx: &TestContext) {
        wait_for(self.run_for).await;
        self.journal.lock().unwrap().push("run finished".into());
    }

    async fn teardown(&mut self, _cx: &TestContext) {
        self.journal.lock().unwrap().push("teardown".into());
    }
}

fn tracked(full: &str, timeout: Duration, run_for: Duration, journal: &Journal) -> TestFactory {
    let journal = Arc::clone(journal);
    TestFactory::new(
        name(full),
        TestKind::Unit,
        TestOptions::timeout(timeout),
        move || {
            Box::new(Tracked {
                journal: Arc::clone(&journal),
                run_for,
            })
        },
    )
}

fn count(journal: &Journal, entry: &str) -> usize {
    journal.lock().unwrap().iter().filter(|e| *e == entry).count()
}

#[test]
fn overrunning_test_times_out_and_still_tears_down() {
    let journal: Journal = Arc::default();
    let mut orchestrator = orchestrator(vec![tracked(
        "M.C.Slow",
        Duration::from_millis(5),
        Duration::from_secs(60),
        &journal,
    )]);
    orchestrator.queue_tests(["M.C.Slow"], RunOptions::new());

    orchestrator.tick();
    std::thread::sleep(Duration::from_millis(10));
    let results = run_to_end(&mut orchestrator);

    assert_eq!(results[0].outcome, Outcome::Fail);
    assert_eq!(results[0].errors.len(), 1);
    assert!(results[0].errors[0].starts_with("Timed out at: "), "{:?}", results[0].errors);
    assert_eq!(count(&journal, "teardown"), 1);
    assert_eq!(count(&journal, "run finished"), 0);
}

#[test]
fn disabling_timeouts_lets_slow_tests_pass() {
    let journal: Journal = Arc::default();
    let mut orchestrator = orchestrator(vec![tracked(
        "M.C.Slow",
        Duration::from_millis(1),
        Duration::from_millis(10),
        &journal,
    )]);
    orchestrator.queue_tests(["M.C.Slow"], RunOptions::new().include_timeouts(false));
    let results = run_to_end(&mut orchestrator);

    assert_eq!(results[0].outcome, Outcome::Success);
    assert_eq!(count(&journal, "run finished"), 1);
}

#[test]
fn stopping_mid_run_tears_down_every_started_test_once() {
    let journal: Journal = Arc::default();
    let mut orchestrator = orchestrator(vec![
        tracked("M.C.A", Duration::from_secs(30), Duration::from_secs(60), &journal),
        tracked("M.C.B", Duration::from_secs(30), Duration::from_secs(60), &journal),
    ]);

    let completions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&completions);
    let teardowns_at_all_complete = Rc::new(RefCell::new(None));
    let observed = Rc::clone(&teardowns_at_all_complete);
    let watch = Arc::clone(&journal);
    let options = RunOptions::new()
        .on_test_complete(move |r| sink.borrow_mut().push(r.clone()))
        .on_all_complete(move |_| *observed.borrow_mut() = Some(count(&watch, "teardown")));

    orchestrator.queue_tests(["M.C.A", "M.C.B"], options);
    orchestrator.tick();
    orchestrator.tick();
    assert_eq!(count(&journal, "setup"), 1);

    orchestrator.stop_tests();
    orchestrator.stop_tests();
    let results = run_to_end(&mut orchestrator);

    // B was still queued and never starts.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name.full(), "M.C.A");
    assert_eq!(results[0].outcome, Outcome::Skipped);
    assert_eq!(count(&journal, "teardown"), 1);
    assert_eq!(*teardowns_at_all_complete.borrow(), Some(1));
    assert_eq!(completions.borrow().len(), 1);
}

#[test]
fn resubmission_is_refused_until_the_run_ends() {
    let journal: Journal = Arc::default();
    let mut orchestrator = orchestrator(vec![logged("M.C.A", TestOptions::default(), 3, &journal)]);

    assert!(orchestrator.queue_tests(["M.C.A"], RunOptions::new()));
    orchestrator.tick();
    assert!(orchestrator.has_running_tests());
    assert!(!orchestrator.queue_tests(["M.C.A"], RunOptions::new()));
    assert_eq!(journal.lock().unwrap().len(), 1);

    run_to_end(&mut orchestrator);
    assert!(!orchestrator.has_running_tests());
    assert!(orchestrator.queue_tests(["M.C.A"], RunOptions::new()));
    let results = run_to_end(&mut orchestrator);
    assert_eq!(results.len(), 1);
    assert_eq!(journal.lock().unwrap().len(), 2);
}

#[test]
fn expect_failures_accumulate_without_stopping_the_test() {
    let mut orchestrator = orchestrator(vec![TestFactory::unit_fn(
        name("M.C.Many"),
        TestOptions::default(),
        |cx| async move {
            expect_eq!(cx, 1, 2);
            suspend().await;
            expect_eq!(cx, "a", "b");
            cx.add_error("resource unavailable");
        },
    )]);
    orchestrator.queue_tests(["M.C.Many"], RunOptions::new());
    let results = run_to_end(&mut orchestrator);

    let errors = &results[0].errors;
    assert_eq!(errors.len(), 3);
    assert!(errors[0].contains("Expect failed: 1 == 2 (1 vs 2)"));
    assert!(errors[1].contains("Expect failed: \"a\" == \"b\""));
    assert_eq!(errors[2], "resource unavailable");
}

/// How a hook behaves once entered.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Yield once.
    Yield,
    /// Hold the scheduler thread, then yield once.
    Block(Duration),
    /// Never finish on its own.
    Hang,
}

impl Step {
    async fn perform(self) {
        match self {
            Step::Yield => suspend().await,
            Step::Block(d) => {
                std::thread::sleep(d);
                suspend().await;
            }
            Step::Hang => wait_for(Duration::from_secs(3600)).await,
        }
    }
}

#[derive(Clone)]
struct Staged {
    journal: Journal,
    run: Step,
    teardown: Step,
    teardown_error: bool,
}

#[async_trait(?Send)]
impl Fixture for Staged {
    async fn run(&mut self, _cx: &TestContext) {
        self.run.perform().await;
        self.journal.lock().unwrap().push("run end".into());
    }

    async fn teardown(&mut self, cx: &TestContext) {
        self.journal.lock().unwrap().push("teardown begin".into());
        self.teardown.perform().await;
        if self.teardown_error {
            cx.add_error("connection left open");
        }
        self.journal.lock().unwrap().push("teardown end".into());
    }
}

fn staged(full: &str, timeout: Duration, fixture: Staged) -> TestFactory {
    TestFactory::new(
        name(full),
        TestKind::Unit,
        TestOptions::timeout(timeout),
        move || Box::new(fixture.clone()),
    )
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[test]
fn late_timeout_detection_still_leaves_teardown_its_allowance() {
    let journal: Journal = Arc::default();
    let fixture = Staged {
        journal: Arc::clone(&journal),
        run: Step::Hang,
        teardown: Step::Yield,
        teardown_error: false,
    };
    let mut orchestrator = orchestrator(vec![staged("M.C.Hung", Duration::from_millis(5), fixture)]);
    orchestrator.queue_tests(["M.C.Hung"], RunOptions::new());

    orchestrator.tick();
    // One slow heartbeat: detection lands past twice the budget.
    std::thread::sleep(Duration::from_millis(16));
    let results = run_to_end(&mut orchestrator);

    assert_eq!(entries(&journal), vec!["teardown begin", "teardown end"]);
    assert_eq!(results[0].outcome, Outcome::Fail);
    assert_eq!(results[0].errors.len(), 1, "{:?}", results[0].errors);
    assert!(results[0].errors[0].starts_with("Timed out at: "));
}

#[test]
fn timeout_inside_teardown_lets_teardown_finish() {
    let journal: Journal = Arc::default();
    let fixture = Staged {
        journal: Arc::clone(&journal),
        run: Step::Yield,
        teardown: Step::Block(Duration::from_millis(30)),
        teardown_error: false,
    };
    let mut orchestrator = orchestrator(vec![staged("M.C.SlowClose", Duration::from_millis(20), fixture)]);
    orchestrator.queue_tests(["M.C.SlowClose"], RunOptions::new());
    let results = run_to_end(&mut orchestrator);

    assert_eq!(entries(&journal), vec!["run end", "teardown begin", "teardown end"]);
    assert_eq!(results[0].outcome, Outcome::Fail);
    assert_eq!(results[0].errors.len(), 1, "{:?}", results[0].errors);
    assert!(results[0].errors[0].starts_with("Timed out at: "));
}

#[test]
fn hung_teardown_is_dropped_after_its_allowance() {
    let journal: Journal = Arc::default();
    let fixture = Staged {
        journal: Arc::clone(&journal),
        run: Step::Hang,
        teardown: Step::Hang,
        teardown_error: false,
    };
    let mut orchestrator = orchestrator(vec![staged("M.C.Stuck", Duration::from_millis(5), fixture)]);
    orchestrator.queue_tests(["M.C.Stuck"], RunOptions::new());
    let results = run_to_end(&mut orchestrator);

    assert_eq!(entries(&journal), vec!["teardown begin"]);
    let errors = &results[0].errors;
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors[0].starts_with("Timed out at: "));
    assert!(errors[1].starts_with("Teardown timed out: "));
    assert!(errors[1].ends_with("/ 10.00ms max"), "{}", errors[1]);
}

#[test]
fn finishing_past_the_budget_still_fails() {
    let mut orchestrator = orchestrator(vec![TestFactory::unit_fn(
        name("M.C.Sluggish"),
        TestOptions::timeout(Duration::from_millis(5)),
        |_cx| async {
            std::thread::sleep(Duration::from_millis(15));
        },
    )]);
    orchestrator.queue_tests(["M.C.Sluggish"], RunOptions::new());
    let results = run_to_end(&mut orchestrator);

    assert_eq!(results[0].outcome, Outcome::Fail);
    assert_eq!(results[0].errors.len(), 1);
    assert!(
        results[0].errors[0].starts_with("Test finished, but overran timeout limit: "),
        "{}",
        results[0].errors[0]
    );
}

#[test]
fn exhausted_timeslice_defers_the_rest_of_the_batch() {
    let journal: Journal = Arc::default();
    let blocking = |full: &str| {
        let journal = Arc::clone(&journal);
        let label = full.to_string();
        TestFactory::unit_fn(name(full), TestOptions::pure(), move |_cx| {
            journal.lock().unwrap().push(format!("run {label}"));
            async {
                std::thread::sleep(Duration::from_millis(2));
                suspend().await;
            }
        })
    };
    let mut orchestrator = orchestrator(vec![blocking("M.C.A"), blocking("M.C.B"), blocking("M.C.C")]);
    orchestrator.queue_tests(
        ["M.C.A", "M.C.B", "M.C.C"],
        RunOptions::new().timeslice(Duration::ZERO),
    );

    assert_eq!(orchestrator.tick(), TickStatus::Continue);
    assert_eq!(entries(&journal), vec!["run M.C.A"]);

    let results = run_to_end(&mut orchestrator);
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.outcome == Outcome::Success));
    assert_eq!(entries(&journal), vec!["run M.C.A", "run M.C.B", "run M.C.C"]);
}

#[test]
fn stopped_test_failing_in_teardown_is_reported_as_failed() {
    let journal: Journal = Arc::default();
    let fixture = Staged {
        journal: Arc::clone(&journal),
        run: Step::Hang,
        teardown: Step::Yield,
        teardown_error: true,
    };
    let mut orchestrator = orchestrator(vec![staged("M.C.Leaky", Duration::from_secs(30), fixture)]);
    orchestrator.queue_tests(["M.C.Leaky"], RunOptions::new());

    orchestrator.tick();
    orchestrator.stop_tests();
    let results = run_to_end(&mut orchestrator);

    assert_eq!(entries(&journal), vec!["teardown begin", "teardown end"]);
    assert_eq!(results[0].outcome, Outcome::Fail);
    assert_eq!(results[0].errors, vec!["connection left open"]);
}
