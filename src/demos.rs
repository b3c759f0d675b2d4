//! Built-in demonstration tests under `Untest.Examples`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

use async_trait::async_trait;

use crate::context::TestContext;
use crate::error::Result;
use crate::fixture::{Fixture, Simulation, WorldHandle, WorldTest};
use crate::models::{TestFlags, TestKind, TestName, TestOptions};
use crate::registry::{self, Registry, TestFactory};
use crate::task::{suspend, wait_ticks, wait_until};
use crate::{
    expect_eq, expect_false, expect_ge, expect_gt, expect_invalid, expect_le, expect_lt,
    expect_ne, expect_near, expect_strcaseeq, expect_strcasene, expect_streq, expect_strne,
    expect_true, expect_valid, require_eq, require_ge, require_gt, require_le, require_lt,
    require_ne, require_near, require_strcaseeq, require_strcasene, require_streq,
    require_strne, require_true, require_false, require_valid, require_invalid,
};

fn name(test: &str) -> TestName {
    TestName::new("Untest", "Examples", test)
}

const PURE_TIMEOUT: TestOptions = TestOptions {
    timeout: Some(Duration::from_millis(50)),
    flags: TestFlags::PURE,
};

pub fn factories() -> Vec<TestFactory> {
    vec![
        TestFactory::unit_fn(name("Expects"), TestOptions::default(), |cx| async move {
            expects(&cx)
        }),
        TestFactory::unit_fn(name("Asserts"), TestOptions::default(), |cx| async move {
            asserts(&cx)
        }),
        TestFactory::unit_fn(
            name("CoroutineSuspend"),
            TestOptions::timeout(Duration::from_millis(32)),
            |_cx| async {
                suspend().await;
            },
        ),
        TestFactory::unit_fn(name("Disabled"), TestOptions::disabled(), |_cx| async {}),
        TestFactory::unit_fn(
            name("DisabledFlag"),
            TestOptions::flags(TestFlags::DISABLED),
            |_cx| async {},
        ),
        TestFactory::unit_fn(name("Pure"), TestOptions::pure(), |_cx| async {}),
        TestFactory::unit_fn(
            name("PureFlag"),
            TestOptions::flags(TestFlags::PURE),
            |_cx| async {},
        ),
        TestFactory::unit_fn(
            name("Timeout"),
            TestOptions::timeout(Duration::from_millis(50)),
            |_cx| async {
                wait_ticks(2).await;
            },
        ),
        TestFactory::unit_fn(name("TimeoutFlags"), PURE_TIMEOUT, |_cx| async {
            wait_ticks(2).await;
        }),
        TestFactory::fixture::<PresetFixture>(name("CustomFixture"), TestOptions::default()),
        TestFactory::fixture::<PresetFixture>(name("CustomFixtureFlags"), PURE_TIMEOUT),
        TestFactory::world(name("WorldSimple"), TestOptions::default(), || Drift),
        TestFactory::new(
            name("ClientServerSimple"),
            TestKind::ClientServer,
            TestOptions::default(),
            || Box::<Loopback>::default(),
        ),
    ]
}

pub fn register(registry: &mut Registry) -> Result<()> {
    registry::register_module(registry, factories())
}

// Expects record a failure but let the test carry on.
fn expects(cx: &TestContext) {
    expect_eq!(cx, 0xBE, 0xBE);
    expect_near!(cx, 1.0f32, 1.00009f32, 0.0001f32);
    expect_ne!(cx, 0x1337, 0xBEEF);
    expect_gt!(cx, 10, 0);
    expect_ge!(cx, 10, 10);
    expect_lt!(cx, 0, 10);
    expect_le!(cx, 10, 10);
    expect_true!(cx, true);
    expect_false!(cx, false);

    let my_str = "My Test String";
    let my_caps = String::from("MY TEST STRING");
    let thunderdome = String::from("Thunderdome");

    expect_streq!(cx, my_str, my_str);
    expect_strne!(cx, my_str, my_caps);
    expect_strne!(cx, my_str, thunderdome);
    expect_strcaseeq!(cx, my_str, my_caps);
    expect_strcaseeq!(cx, my_caps, my_str);
    expect_strcasene!(cx, thunderdome, my_str);

    let valid = Some(Rc::new(0));
    let invalid: Weak<i32> = Weak::new();
    expect_valid!(cx, valid);
    expect_invalid!(cx, invalid);
}

// Asserts leave the test at the first failure.
fn asserts(cx: &TestContext) {
    require_eq!(cx, 0xBE, 0xBE);
    require_near!(cx, 1.0f32, 1.00009f32, 0.0001f32);
    require_ne!(cx, 0x1337, 0xBEEF);
    require_gt!(cx, 10, 0);
    require_ge!(cx, 10, 10);
    require_lt!(cx, 0, 10);
    require_le!(cx, 10, 10);
    require_true!(cx, true);
    require_false!(cx, false);

    let my_str = "MyTest String";
    let my_caps = String::from("MYTEST STRING");
    let thunderdome = "Thunderdome";

    require_streq!(cx, my_str, my_str);
    require_strne!(cx, my_str, my_caps);
    require_strcaseeq!(cx, my_str, my_caps);
    require_strcasene!(cx, my_caps, thunderdome);

    let valid: std::result::Result<u8, ()> = Ok(7);
    let invalid: Option<u8> = None;
    require_valid!(cx, valid);
    require_invalid!(cx, invalid);
}

/// Builds shared data in Setup and releases it in Teardown.
#[derive(Default)]
struct PresetFixture {
    preset: Option<Rc<i32>>,
}

#[async_trait(?Send)]
impl Fixture for PresetFixture {
    async fn setup(&mut self, _cx: &TestContext) {
        self.preset = Some(Rc::new(1337));
    }

    async fn run(&mut self, cx: &TestContext) {
        require_valid!(cx, self.preset);
        expect_eq!(cx, self.preset.as_deref(), Some(&1337));
    }

    async fn teardown(&mut self, _cx: &TestContext) {
        self.preset = None;
    }
}

/// A body drifting at constant speed.
#[derive(Debug, Default)]
struct Plane {
    frames: u32,
    position: f64,
}

impl Simulation for Plane {
    fn tick(&mut self, delta: Duration) {
        self.frames += 1;
        self.position += delta.as_secs_f64() * 10.0;
    }
}

struct Drift;

#[async_trait(?Send)]
impl WorldTest for Drift {
    type World = Plane;

    fn create_world(&mut self, _cx: &TestContext) -> anyhow::Result<Plane> {
        Ok(Plane::default())
    }

    async fn run(&mut self, cx: &TestContext, world: WorldHandle<Plane>) {
        let start = world.borrow().position;
        let observed = Rc::clone(&world);
        wait_until(|| observed.borrow().frames >= 3).await;
        expect_ge!(cx, world.borrow().position, start);
    }
}

/// In-process server and client exchanging messages over two queues.
#[derive(Default)]
struct Loopback {
    to_server: Rc<RefCell<VecDeque<String>>>,
    to_client: Rc<RefCell<VecDeque<String>>>,
}

#[async_trait(?Send)]
impl Fixture for Loopback {
    async fn setup(&mut self, _cx: &TestContext) {
        self.to_server.borrow_mut().push_back("hello".into());
    }

    async fn run(&mut self, cx: &TestContext) {
        // Server side: answer the handshake on the next tick.
        suspend().await;
        let request = self.to_server.borrow_mut().pop_front();
        require_eq!(cx, request.as_deref(), Some("hello"));
        self.to_client.borrow_mut().push_back("welcome".into());

        // Client side: wait for the reply.
        let inbox = Rc::clone(&self.to_client);
        wait_until(|| !inbox.borrow().is_empty()).await;
        let reply = self.to_client.borrow_mut().pop_front();
        expect_eq!(cx, reply.as_deref(), Some("welcome"));
    }

    async fn teardown(&mut self, cx: &TestContext) {
        expect_true!(cx, self.to_server.borrow().is_empty());
        self.to_client.borrow_mut().clear();
    }
}
