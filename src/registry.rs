use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::context::TestContext;
use crate::error::{Result, UntestedError};
use crate::fixture::{FnFixture, Fixture, WorldFixture, WorldTest};
use crate::models::{KindMask, TestKind, TestName, TestOptions};

type Constructor = Arc<dyn Fn() -> Box<dyn Fixture> + Send + Sync>;

/// Everything needed to build a fresh fixture for one run of a test.
#[derive(Clone)]
pub struct TestFactory {
    name: TestName,
    kind: TestKind,
    options: TestOptions,
    constructor: Constructor,
}

impl TestFactory {
    pub fn new<F>(name: TestName, kind: TestKind, options: TestOptions, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Fixture> + Send + Sync + 'static,
    {
        Self {
            name,
            kind,
            options: options.resolve(kind),
            constructor: Arc::new(constructor),
        }
    }

    /// Unit test whose Run hook is `body`.
    pub fn unit_fn<F, Fut>(name: TestName, options: TestOptions, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let body = Arc::new(body);
        Self::new(name, TestKind::Unit, options, move || {
            Box::new(FnFixture::new(Arc::clone(&body)))
        })
    }

    /// Unit test built from a fixture type's `Default`.
    pub fn fixture<T>(name: TestName, options: TestOptions) -> Self
    where
        T: Fixture + Default + 'static,
    {
        Self::new(name, TestKind::Unit, options, || Box::new(T::default()))
    }

    /// World test; `make` builds a fresh test body for every run.
    pub fn world<T, F>(name: TestName, options: TestOptions, make: F) -> Self
    where
        T: WorldTest + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(name, TestKind::World, options, move || {
            Box::new(WorldFixture::new(make()))
        })
    }

    pub fn name(&self) -> &TestName {
        &self.name
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn options(&self) -> TestOptions {
        self.options
    }

    pub fn build(&self) -> Box<dyn Fixture> {
        (self.constructor)()
    }

    pub fn info(&self) -> TestInfo {
        TestInfo {
            name: self.name.clone(),
            kind: self.kind,
            options: self.options,
        }
    }
}

impl fmt::Debug for TestFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestFactory")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Static metadata of a registered test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestInfo {
    pub name: TestName,
    pub kind: TestKind,
    pub options: TestOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive substring of the full name; empty matches everything.
    pub search: String,
    pub kinds: KindMask,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            kinds: KindMask::ALL,
        }
    }
}

impl SearchFilter {
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    pub fn kinds(mut self, kinds: KindMask) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn matches(&self, factory: &TestFactory) -> bool {
        if !self.kinds.intersects(factory.kind.mask()) {
            return false;
        }
        self.search.is_empty()
            || factory
                .name
                .full()
                .to_lowercase()
                .contains(&self.search.to_lowercase())
    }
}

/// Maps full test names to their factories.
#[derive(Debug, Default)]
pub struct Registry {
    tests: BTreeMap<String, TestFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: TestFactory) -> Result<()> {
        let key = factory.name.full();
        if self.tests.contains_key(&key) {
            return Err(UntestedError::DuplicateTest(key));
        }
        debug!(test = %key, kind = factory.kind.label(), "registered");
        self.tests.insert(key, factory);
        Ok(())
    }

    /// Remove a test. Removing an absent name is a no-op.
    pub fn unregister(&mut self, name: &TestName) {
        if self.tests.remove(&name.full()).is_some() {
            debug!(test = %name, "unregistered");
        }
    }

    pub fn get(&self, full_name: &str) -> Option<&TestFactory> {
        self.tests.get(full_name)
    }

    /// Matching tests, ordered by full name.
    pub fn find(&self, filter: &SearchFilter) -> Vec<TestInfo> {
        self.tests
            .values()
            .filter(|f| filter.matches(f))
            .map(TestFactory::info)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

static GLOBAL: Lazy<Arc<RwLock<Registry>>> = Lazy::new(|| Arc::new(RwLock::new(Registry::new())));

/// The process-wide registry, created on first use.
pub fn global() -> Arc<RwLock<Registry>> {
    Arc::clone(&GLOBAL)
}

/// Register every test of a module. Stops at the first collision; tests registered
/// before it stay registered.
pub fn register_module(
    registry: &mut Registry,
    factories: impl IntoIterator<Item = TestFactory>,
) -> Result<()> {
    for factory in factories {
        registry.register(factory)?;
    }
    Ok(())
}

pub fn unregister_module<'a>(
    registry: &mut Registry,
    names: impl IntoIterator<Item = &'a TestName>,
) {
    for name in names {
        registry.unregister(name);
    }
}
