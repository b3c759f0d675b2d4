//! Per-test state and the assertion engine fixtures call into.
//!
//! Every predicate returns `true` without side effects when its condition holds.
//! On failure it appends one formatted line to the context's error list and
//! returns `false`; whether the caller keeps going ("expect") or leaves the hook
//! ("assert") is decided by the calling macro, not here.

use std::cell::{Ref, RefCell};
use std::fmt::Debug;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::models::TestName;

/// Where a test is in its Setup → Run → Teardown lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Created,
    SettingUp,
    Running,
    TearingDown,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Expect,
    Assert,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Expect => "Expect",
            Severity::Assert => "Assert",
        }
    }
}

/// Call-site information captured by the assertion macros.
#[derive(Debug, Clone, Copy)]
pub struct Site {
    pub file: &'static str,
    pub line: u32,
    pub lhs: &'static str,
    pub rhs: &'static str,
    pub severity: Severity,
}

impl Site {
    pub const fn new(
        file: &'static str,
        line: u32,
        lhs: &'static str,
        rhs: &'static str,
        severity: Severity,
    ) -> Self {
        Self {
            file,
            line,
            lhs,
            rhs,
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Sensitive,
    Insensitive,
}

impl CaseMode {
    fn label(&self) -> &'static str {
        match self {
            CaseMode::Sensitive => "case sensitive",
            CaseMode::Insensitive => "case insensitive",
        }
    }

    fn matches(&self, a: &str, b: &str) -> bool {
        match self {
            CaseMode::Sensitive => a == b,
            CaseMode::Insensitive => a.to_lowercase() == b.to_lowercase(),
        }
    }
}

/// Values that can be asked whether they refer to something live.
pub trait Validity {
    fn is_valid(&self) -> bool;
}

impl<T> Validity for Option<T> {
    fn is_valid(&self) -> bool {
        self.is_some()
    }
}

impl<T, E> Validity for Result<T, E> {
    fn is_valid(&self) -> bool {
        self.is_ok()
    }
}

impl<T> Validity for std::rc::Weak<T> {
    fn is_valid(&self) -> bool {
        self.strong_count() > 0
    }
}

impl<T> Validity for std::sync::Weak<T> {
    fn is_valid(&self) -> bool {
        self.strong_count() > 0
    }
}

impl<T> Validity for *const T {
    fn is_valid(&self) -> bool {
        !self.is_null()
    }
}

impl<T> Validity for *mut T {
    fn is_valid(&self) -> bool {
        !self.is_null()
    }
}

#[derive(Debug)]
struct ContextState {
    name: TestName,
    timeout: Duration,
    phase: Phase,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    teardown_started_at: Option<Instant>,
    errors: Vec<String>,
    timed_out: bool,
}

/// Shared handle to one test's mutable state.
///
/// The scheduler and the fixture each hold a clone; all access happens on the
/// scheduler thread between suspension points.
#[derive(Debug, Clone)]
pub struct TestContext {
    inner: Rc<RefCell<ContextState>>,
}

impl TestContext {
    pub fn new(name: TestName, timeout: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ContextState {
                name,
                timeout,
                phase: Phase::Created,
                started_at: None,
                finished_at: None,
                teardown_started_at: None,
                errors: Vec::new(),
                timed_out: false,
            })),
        }
    }

    pub fn name(&self) -> TestName {
        self.inner.borrow().name.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.inner.borrow().timeout
    }

    pub fn phase(&self) -> Phase {
        self.inner.borrow().phase
    }

    /// Time since Setup began, or `None` if the lifecycle has not been resumed yet.
    pub fn elapsed(&self) -> Option<Duration> {
        self.inner.borrow().started_at.map(|t| t.elapsed())
    }

    /// Setup start to Teardown end. Zero if the test never started.
    pub fn duration(&self) -> Duration {
        let state = self.inner.borrow();
        match (state.started_at, state.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn errors(&self) -> Ref<'_, [String]> {
        Ref::map(self.inner.borrow(), |s| s.errors.as_slice())
    }

    pub fn has_errors(&self) -> bool {
        !self.inner.borrow().errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.inner.borrow().errors.len()
    }

    /// Record a failure directly, e.g. a resource the test needs could not be built.
    pub fn add_error(&self, error: impl Into<String>) {
        self.inner.borrow_mut().errors.push(error.into());
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.inner.borrow_mut().phase = phase;
    }

    pub(crate) fn mark_started(&self) {
        let mut state = self.inner.borrow_mut();
        if state.started_at.is_none() {
            state.started_at = Some(Instant::now());
        }
    }

    pub(crate) fn mark_finished(&self) {
        let mut state = self.inner.borrow_mut();
        if state.finished_at.is_none() {
            state.finished_at = Some(Instant::now());
        }
    }

    /// Restart the Teardown allowance from now.
    pub(crate) fn start_teardown_clock(&self) {
        self.inner.borrow_mut().teardown_started_at = Some(Instant::now());
    }

    /// Time since the Teardown allowance began, or `None` before Teardown.
    pub(crate) fn teardown_elapsed(&self) -> Option<Duration> {
        self.inner.borrow().teardown_started_at.map(|t| t.elapsed())
    }

    pub(crate) fn timed_out(&self) -> bool {
        self.inner.borrow().timed_out
    }

    pub(crate) fn set_timed_out(&self) {
        self.inner.borrow_mut().timed_out = true;
    }

    pub(crate) fn take_errors(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.borrow_mut().errors)
    }

    fn fail(&self, site: &Site, detail: String) -> bool {
        self.add_error(format!(
            "({}:{}) {} failed: {}",
            site.file,
            site.line,
            site.severity.label(),
            detail
        ));
        false
    }

    fn compare<A, B>(&self, site: &Site, holds: bool, op: &str, a: &A, b: &B) -> bool
    where
        A: Debug + ?Sized,
        B: Debug + ?Sized,
    {
        if holds {
            return true;
        }
        self.fail(
            site,
            format!("{} {} {} ({:?} vs {:?})", site.lhs, op, site.rhs, a, b),
        )
    }

    pub fn check_eq<A, B>(&self, site: &Site, a: &A, b: &B) -> bool
    where
        A: PartialEq<B> + Debug + ?Sized,
        B: Debug + ?Sized,
    {
        self.compare(site, a == b, "==", a, b)
    }

    pub fn check_ne<A, B>(&self, site: &Site, a: &A, b: &B) -> bool
    where
        A: PartialEq<B> + Debug + ?Sized,
        B: Debug + ?Sized,
    {
        self.compare(site, a != b, "!=", a, b)
    }

    pub fn check_gt<A, B>(&self, site: &Site, a: &A, b: &B) -> bool
    where
        A: PartialOrd<B> + Debug + ?Sized,
        B: Debug + ?Sized,
    {
        self.compare(site, a > b, ">", a, b)
    }

    pub fn check_ge<A, B>(&self, site: &Site, a: &A, b: &B) -> bool
    where
        A: PartialOrd<B> + Debug + ?Sized,
        B: Debug + ?Sized,
    {
        self.compare(site, a >= b, ">=", a, b)
    }

    pub fn check_lt<A, B>(&self, site: &Site, a: &A, b: &B) -> bool
    where
        A: PartialOrd<B> + Debug + ?Sized,
        B: Debug + ?Sized,
    {
        self.compare(site, a < b, "<", a, b)
    }

    pub fn check_le<A, B>(&self, site: &Site, a: &A, b: &B) -> bool
    where
        A: PartialOrd<B> + Debug + ?Sized,
        B: Debug + ?Sized,
    {
        self.compare(site, a <= b, "<=", a, b)
    }

    /// `|a - b| <= tolerance`. A negative or NaN tolerance is itself a failure.
    pub fn check_near(&self, site: &Site, a: f64, b: f64, tolerance: f64) -> bool {
        if tolerance.is_nan() || tolerance < 0.0 {
            return self.fail(
                site,
                format!("tolerance must not be negative, but got {tolerance}"),
            );
        }
        if (a - b).abs() <= tolerance {
            return true;
        }
        self.fail(
            site,
            format!(
                "{} ≈≈ {} ({a} vs {b}, outside tolerance {tolerance})",
                site.lhs, site.rhs
            ),
        )
    }

    pub fn check_str_eq(&self, site: &Site, a: &str, b: &str, mode: CaseMode) -> bool {
        if mode.matches(a, b) {
            return true;
        }
        self.fail(
            site,
            format!(
                "{} == {} ({a:?} vs {b:?}, {})",
                site.lhs,
                site.rhs,
                mode.label()
            ),
        )
    }

    pub fn check_str_ne(&self, site: &Site, a: &str, b: &str, mode: CaseMode) -> bool {
        if !mode.matches(a, b) {
            return true;
        }
        self.fail(
            site,
            format!(
                "{} != {} ({a:?} vs {b:?}, {})",
                site.lhs,
                site.rhs,
                mode.label()
            ),
        )
    }

    pub fn check_true(&self, site: &Site, value: bool) -> bool {
        if value {
            return true;
        }
        self.fail(site, format!("{} should be true, but is false", site.lhs))
    }

    pub fn check_false(&self, site: &Site, value: bool) -> bool {
        if !value {
            return true;
        }
        self.fail(site, format!("{} should be false, but is true", site.lhs))
    }

    pub fn check_valid<T: Validity + ?Sized>(&self, site: &Site, value: &T) -> bool {
        if value.is_valid() {
            return true;
        }
        self.fail(site, format!("{} should be valid, but is not", site.lhs))
    }

    pub fn check_invalid<T: Validity + ?Sized>(&self, site: &Site, value: &T) -> bool {
        if !value.is_valid() {
            return true;
        }
        self.fail(site, format!("{} should be invalid, but is valid", site.lhs))
    }
}
