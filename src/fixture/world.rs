//! Fixtures that run against a simulated world.
//!
//! The world is created during Setup and ticked by the frame delta before each
//! resume of the test body, so the body observes the world advancing between its
//! own suspension points.

use std::cell::RefCell;
use std::rc::Rc;
use std::task::Poll;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::Fixture;
use crate::context::TestContext;
use crate::task::suspend;

/// Something that advances when time passes.
pub trait Simulation {
    fn tick(&mut self, delta: Duration);
}

pub type WorldHandle<W> = Rc<RefCell<W>>;

/// A test body that needs a world.
///
/// The body must not hold a borrow of the world across a suspension point; the
/// world is ticked while the body is parked.
#[async_trait(?Send)]
pub trait WorldTest {
    type World: Simulation + 'static;

    fn create_world(&mut self, cx: &TestContext) -> anyhow::Result<Self::World>;

    async fn setup(&mut self, _cx: &TestContext, _world: &WorldHandle<Self::World>) {}

    async fn run(&mut self, cx: &TestContext, world: WorldHandle<Self::World>);

    async fn teardown(&mut self, _cx: &TestContext, _world: &WorldHandle<Self::World>) {}
}

pub struct WorldFixture<T: WorldTest> {
    test: T,
    world: Option<WorldHandle<T::World>>,
}

impl<T: WorldTest> WorldFixture<T> {
    pub fn new(test: T) -> Self {
        Self { test, world: None }
    }
}

#[async_trait(?Send)]
impl<T: WorldTest + 'static> Fixture for WorldFixture<T> {
    async fn setup(&mut self, cx: &TestContext) {
        let world = match self.test.create_world(cx) {
            Ok(world) => Rc::new(RefCell::new(world)),
            Err(e) => {
                cx.add_error(format!("failed to create test world: {e:#}"));
                return;
            }
        };
        self.world = Some(Rc::clone(&world));
        self.test.setup(cx, &world).await;
    }

    async fn run(&mut self, cx: &TestContext) {
        let Some(world) = self.world.clone() else {
            cx.add_error("test world missing at run");
            return;
        };

        let mut body = self.test.run(cx, Rc::clone(&world));
        let mut last_frame = Instant::now();
        loop {
            let now = Instant::now();
            match world.try_borrow_mut() {
                Ok(mut w) => w.tick(now.saturating_duration_since(last_frame)),
                Err(_) => debug!(test = %cx.name(), "world borrowed across suspension, frame skipped"),
            }
            last_frame = now;

            if let Poll::Ready(()) = futures_util::poll!(&mut body) {
                break;
            }
            suspend().await;
        }
    }

    async fn teardown(&mut self, cx: &TestContext) {
        if let Some(world) = self.world.take() {
            self.test.teardown(cx, &world).await;
        }
    }
}
