//! Resumable units of work driven by the scheduler tick.
//!
//! A [`Task`] wraps a future and polls it once per [`Task::resume`]. Fixture code
//! parks itself with the suspension points in this module; between two of them a
//! hook runs uninterrupted. Killing a task drops the future where it is parked, so
//! locals held across the suspension point are released in order.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use futures_util::task::noop_waker_ref;

pub struct Task {
    future: Option<LocalBoxFuture<'static, ()>>,
}

impl Task {
    pub fn new(future: impl Future<Output = ()> + 'static) -> Self {
        Self {
            future: Some(future.boxed_local()),
        }
    }

    /// Run until the next suspension point. Returns true once the task is done.
    pub fn resume(&mut self) -> bool {
        if let Some(future) = self.future.as_mut() {
            let mut cx = Context::from_waker(noop_waker_ref());
            if future.as_mut().poll(&mut cx).is_ready() {
                self.future = None;
            }
        }
        self.future.is_none()
    }

    pub fn is_done(&self) -> bool {
        self.future.is_none()
    }

    /// Drop the parked future. The task reports done afterwards.
    pub fn kill(&mut self) {
        self.future = None;
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Future returned by [`suspend`].
#[derive(Debug, Default)]
#[must_use = "suspension points do nothing unless awaited"]
pub struct Suspend {
    yielded: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Yield back to the scheduler once; resumes on the next tick.
pub fn suspend() -> Suspend {
    Suspend::default()
}

/// Yield for `ticks` scheduler ticks.
pub async fn wait_ticks(ticks: usize) {
    for _ in 0..ticks {
        suspend().await;
    }
}

/// Yield until `condition` holds. Checked once per tick, starting immediately.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        suspend().await;
    }
}

/// Yield until at least `duration` of wall-clock time has passed.
pub async fn wait_for(duration: Duration) {
    let deadline = Instant::now() + duration;
    wait_until(|| Instant::now() >= deadline).await;
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn task_without_suspension_finishes_on_first_resume() {
        let mut task = Task::new(async {});
        assert!(!task.is_done());
        assert!(task.resume());
        assert!(task.is_done());
    }

    #[test]
    fn each_suspend_costs_one_resume() {
        let steps = Rc::new(Cell::new(0));
        let counter = Rc::clone(&steps);
        let mut task = Task::new(async move {
            counter.set(1);
            suspend().await;
            counter.set(2);
            wait_ticks(2).await;
            counter.set(3);
        });

        assert!(!task.resume());
        assert_eq!(steps.get(), 1);
        assert!(!task.resume());
        assert_eq!(steps.get(), 2);
        assert!(!task.resume());
        assert!(task.resume());
        assert_eq!(steps.get(), 3);
        // Resuming a finished task is a no-op.
        assert!(task.resume());
    }

    #[test]
    fn wait_until_polls_the_condition_each_tick() {
        let flag = Rc::new(Cell::new(false));
        let observed = Rc::clone(&flag);
        let mut task = Task::new(async move {
            wait_until(|| observed.get()).await;
        });

        assert!(!task.resume());
        assert!(!task.resume());
        flag.set(true);
        assert!(task.resume());
    }

    #[test]
    fn kill_drops_the_parked_future() {
        struct DropFlag(Rc<Cell<bool>>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let dropped = Rc::new(Cell::new(false));
        let guard = DropFlag(Rc::clone(&dropped));
        let reached_end = Rc::new(Cell::new(false));
        let end = Rc::clone(&reached_end);
        let mut task = Task::new(async move {
            let _guard = guard;
            suspend().await;
            end.set(true);
        });

        assert!(!task.resume());
        task.kill();
        assert!(task.is_done());
        assert!(dropped.get());
        assert!(!reached_end.get());
    }

    #[test]
    fn wait_for_zero_does_not_suspend() {
        let mut task = Task::new(wait_for(Duration::ZERO));
        assert!(task.resume());
    }
}
