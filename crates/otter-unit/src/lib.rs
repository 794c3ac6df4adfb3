//! # Otter Unit
//!
//! Fixture-based unit test harness.
//!
//! A fixture is a [`TestModule`] exporting optional lifecycle hooks and
//! named test functions. Every hook and test body runs in its own
//! [`Context`], a single-use completion token the body must pass or fail
//! (synchronously or later from another task) before its timeout elapses.
//! Fixtures, and the tests inside them, run strictly one after another.

#![warn(clippy::all)]

pub mod active;
pub mod cli;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod fixture;
pub mod invoker;
pub mod module;
pub mod report;
pub mod result;
pub mod step;
pub mod suite;

pub use active::ActiveContext;
pub use context::{Completion, Context, ContextState, DEFAULT_TIMEOUT};
pub use discovery::{FIXTURE_SUFFIX, FixtureSource, Registry};
pub use error::{AssertionFailure, HarnessError, HarnessResult, TestError};
pub use fixture::{FixtureInvoker, FixtureRef};
pub use invoker::TestInvoker;
pub use module::{GlobalHooks, Hook, TEST_PREFIX, TestModule};
pub use report::{ConsoleReporter, RecordingReporter, ReportEvent, Reporter, StepLabel};
pub use result::RunResult;
pub use step::StepRunner;
pub use suite::SuiteOrchestrator;
