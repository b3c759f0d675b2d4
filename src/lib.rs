//! Cooperative, tick-driven test execution.
//!
//! Tests are registered by name in a [`Registry`], queued on an [`Orchestrator`],
//! and driven through Setup, Run and Teardown one scheduler tick at a time.

pub mod assert;
pub mod config;
pub mod context;
pub mod demos;
pub mod error;
pub mod fixture;
pub mod models;
pub mod registry;
pub mod report;
pub mod runner;
pub mod task;

pub use context::{CaseMode, Phase, TestContext};
pub use error::{Result, UntestedError};
pub use fixture::{Fixture, Simulation, WorldHandle, WorldTest};
pub use models::{KindMask, Outcome, TestFlags, TestKind, TestName, TestOptions, TestResult};
pub use registry::{Registry, SearchFilter, TestFactory, TestInfo};
pub use runner::{Orchestrator, RunEvent, RunOptions, TickStatus};
