use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-test behavior switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TestFlags: u32 {
        /// Skipped in all runs unless the run opts in to disabled tests.
        const DISABLED = 0b01;
        /// Has no side effects; may share an admission batch with other pure tests.
        const PURE = 0b10;
    }
}

bitflags! {
    /// Set of fixture kinds, used to filter searches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KindMask: u32 {
        const UNIT = 0b001;
        const WORLD = 0b010;
        const CLIENT_SERVER = 0b100;
        const ALL = Self::UNIT.bits() | Self::WORLD.bits() | Self::CLIENT_SERVER.bits();
    }
}

impl Default for KindMask {
    fn default() -> Self {
        KindMask::ALL
    }
}

/// The flavor of fixture a test is built on. Determines the default timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    Unit,
    World,
    ClientServer,
}

impl TestKind {
    pub fn default_timeout(&self) -> Duration {
        match self {
            TestKind::Unit => Duration::from_millis(500),
            TestKind::World => Duration::from_millis(1000),
            TestKind::ClientServer => Duration::from_millis(2000),
        }
    }

    pub fn mask(&self) -> KindMask {
        match self {
            TestKind::Unit => KindMask::UNIT,
            TestKind::World => KindMask::WORLD,
            TestKind::ClientServer => KindMask::CLIENT_SERVER,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestKind::Unit => "unit",
            TestKind::World => "world",
            TestKind::ClientServer => "client-server",
        }
    }
}

/// Static options a test is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestOptions {
    /// `None` (or zero) falls back to the kind default when registered.
    pub timeout: Option<Duration>,
    pub flags: TestFlags,
}

impl TestOptions {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            flags: TestFlags::empty(),
        }
    }

    pub fn flags(flags: TestFlags) -> Self {
        Self {
            timeout: None,
            flags,
        }
    }

    pub fn disabled() -> Self {
        Self::flags(TestFlags::DISABLED)
    }

    pub fn pure() -> Self {
        Self::flags(TestFlags::PURE)
    }

    pub fn with_flags(mut self, flags: TestFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_set(&self, flags: TestFlags) -> bool {
        self.flags.intersects(flags)
    }

    pub fn is_disabled(&self) -> bool {
        self.is_set(TestFlags::DISABLED)
    }

    pub fn is_pure(&self) -> bool {
        self.is_set(TestFlags::PURE)
    }

    /// Fill in the kind default for an unset or zero timeout.
    pub fn resolve(mut self, kind: TestKind) -> Self {
        if self.timeout.is_none_or(|t| t.is_zero()) {
            self.timeout = Some(kind.default_timeout());
        }
        self
    }

    /// Effective timeout; only meaningful after [`TestOptions::resolve`].
    pub fn timeout_or_default(&self, kind: TestKind) -> Duration {
        self.resolve(kind).timeout.unwrap_or_else(|| kind.default_timeout())
    }
}
