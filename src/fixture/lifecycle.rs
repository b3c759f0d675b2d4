//! Setup → Run → Teardown state machine.
//!
//! A [`Lifecycle`] owns one fixture, its context, and the task currently driving
//! it. Nothing runs at construction: the start timestamp is taken on the first
//! resume so that time spent waiting in the queue is not charged to the test.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::Fixture;
use crate::context::{Phase, TestContext};
use crate::task::Task;

pub type SharedFixture = Rc<RefCell<Box<dyn Fixture>>>;

/// What [`Lifecycle::abort_to_teardown`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    /// Never resumed; Setup did not begin, so there is nothing to tear down.
    NotStarted,
    /// Already in Teardown (or done); the existing task was left to finish.
    AlreadyTearingDown,
    /// In-flight Setup or Run was killed and a Teardown-only task took its place.
    Relaunched,
}

pub struct Lifecycle {
    fixture: SharedFixture,
    cx: TestContext,
    task: Task,
}

impl Lifecycle {
    pub fn new(fixture: Box<dyn Fixture>, cx: TestContext) -> Self {
        let fixture: SharedFixture = Rc::new(RefCell::new(fixture));
        let task = full(Rc::clone(&fixture), cx.clone());
        Self { fixture, cx, task }
    }

    pub fn context(&self) -> &TestContext {
        &self.cx
    }

    pub fn phase(&self) -> Phase {
        self.cx.phase()
    }

    /// Advance to the next suspension point. Returns true once done.
    pub fn resume(&mut self) -> bool {
        self.task.resume()
    }

    pub fn is_done(&self) -> bool {
        self.task.is_done()
    }

    /// Stop whatever phase is in flight and continue with Teardown only.
    pub fn abort_to_teardown(&mut self) -> Abort {
        match self.cx.phase() {
            Phase::Created => {
                self.task.kill();
                self.cx.set_phase(Phase::Done);
                Abort::NotStarted
            }
            Phase::TearingDown | Phase::Done => Abort::AlreadyTearingDown,
            Phase::SettingUp | Phase::Running => {
                self.task.kill();
                self.cx.set_phase(Phase::TearingDown);
                self.task = teardown_only(Rc::clone(&self.fixture), self.cx.clone());
                Abort::Relaunched
            }
        }
    }

    /// Drop the in-flight task outright, Teardown included.
    pub fn kill(&mut self) {
        self.task.kill();
        self.cx.mark_finished();
        self.cx.set_phase(Phase::Done);
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("cx", &self.cx)
            .field("task", &self.task)
            .finish()
    }
}

// The fixture borrow is held across suspension points. Only one task per
// lifecycle exists at a time, and a killed task releases its borrow on drop.
/// Task running Setup, Run and Teardown in order.
#[allow(clippy::await_holding_refcell_ref)]
pub fn full(fixture: SharedFixture, cx: TestContext) -> Task {
    Task::new(async move {
        cx.mark_started();
        cx.set_phase(Phase::SettingUp);
        fixture.borrow_mut().setup(&cx).await;

        cx.set_phase(Phase::Running);
        if cx.has_errors() {
            debug!(test = %cx.name(), "setup failed, skipping run");
        } else {
            fixture.borrow_mut().run(&cx).await;
        }

        teardown(&fixture, &cx).await;
    })
}

/// Task running only Teardown.
pub fn teardown_only(fixture: SharedFixture, cx: TestContext) -> Task {
    Task::new(async move {
        teardown(&fixture, &cx).await;
    })
}

#[allow(clippy::await_holding_refcell_ref)]
async fn teardown(fixture: &SharedFixture, cx: &TestContext) {
    cx.set_phase(Phase::TearingDown);
    cx.start_teardown_clock();
    fixture.borrow_mut().teardown(cx).await;
    cx.mark_finished();
    cx.set_phase(Phase::Done);
}
