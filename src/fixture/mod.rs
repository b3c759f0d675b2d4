pub mod lifecycle;
pub mod world;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::TestContext;

pub use lifecycle::{Abort, Lifecycle};
pub use world::{Simulation, WorldFixture, WorldHandle, WorldTest};

/// The hooks a concrete test implements.
///
/// Each hook may suspend any number of times (see [`crate::task`]). Teardown always
/// runs once Setup has begun, even when Setup failed, Run bailed out on a fatal
/// assertion, the test timed out, or the run was stopped.
#[async_trait(?Send)]
pub trait Fixture {
    async fn setup(&mut self, _cx: &TestContext) {}

    async fn run(&mut self, cx: &TestContext);

    async fn teardown(&mut self, _cx: &TestContext) {}
}

/// Run-only fixture backed by a closure.
pub struct FnFixture<F> {
    body: Arc<F>,
}

impl<F> FnFixture<F> {
    pub fn new(body: Arc<F>) -> Self {
        Self { body }
    }
}

#[async_trait(?Send)]
impl<F, Fut> Fixture for FnFixture<F>
where
    F: Fn(TestContext) -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    async fn run(&mut self, cx: &TestContext) {
        let body = &*self.body;
        body(cx.clone()).await;
    }
}
