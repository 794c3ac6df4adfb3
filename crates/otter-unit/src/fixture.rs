//! Fixture lifecycle: fixtureSetUp, every eligible test, fixtureTearDown

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tokio::time::Instant;

use crate::discovery::FixtureSource;
use crate::error::TestError;
use crate::invoker::TestInvoker;
use crate::module::TestModule;
use crate::report::{Reporter, StepLabel};
use crate::result::RunResult;
use crate::step::StepRunner;

/// Path-like identifier of a discovered fixture, e.g. `math/add_fixture`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FixtureRef(String);

impl FixtureRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for FixtureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FixtureRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Runs a single fixture and accumulates its [`RunResult`].
///
/// A failing fixtureSetUp counts every eligible test as failed without
/// running any of them, and skips fixtureTearDown. A failing
/// fixtureTearDown adds one failure; tests that already ran keep their
/// outcome and are not counted again.
pub struct FixtureInvoker<'a> {
    steps: &'a StepRunner,
    reporter: &'a dyn Reporter,
    selected_test: Option<&'a str>,
}

impl<'a> FixtureInvoker<'a> {
    pub fn new(steps: &'a StepRunner, reporter: &'a dyn Reporter, selected_test: Option<&'a str>) -> Self {
        Self {
            steps,
            reporter,
            selected_test,
        }
    }

    pub async fn run(&self, fixture: &FixtureRef, source: &dyn FixtureSource) -> RunResult {
        let started = Instant::now();
        self.reporter.on_fixture_start(fixture);

        let mut result = RunResult::new();
        match source.load(fixture) {
            Ok(module) => self.run_module(&module, &mut result).await,
            Err(error) => {
                tracing::warn!(%fixture, %error, "failed to load fixture");
                let error = TestError::Other(anyhow::Error::new(error));
                self.reporter.on_step_outcome(&StepLabel::FixtureLoad, Some(&error));
                result.fail_unrun(1);
            }
        }

        result.duration = started.elapsed();
        self.reporter.on_fixture_done(fixture, &result);
        result
    }

    async fn run_module(&self, module: &TestModule, result: &mut RunResult) {
        let tests = module.eligible_tests(self.selected_test);
        tracing::debug!(tests = tests.len(), "running fixture");

        if let Some(hook) = module.fixture_set_up() {
            let label = StepLabel::FixtureSetUp;
            match self.steps.run(&label, hook).await {
                Ok(()) => self.reporter.on_step_outcome(&label, None),
                Err(error) => {
                    self.reporter.on_step_outcome(&label, Some(&error));
                    result.fail_unrun(tests.len());
                    return;
                }
            }
        }

        let invoker = TestInvoker::new(self.steps, self.reporter);
        for name in &tests {
            let success = invoker.run(module, name).await;
            result.record(success);
        }

        if let Some(hook) = module.fixture_tear_down() {
            let label = StepLabel::FixtureTearDown;
            match self.steps.run(&label, hook).await {
                Ok(()) => self.reporter.on_step_outcome(&label, None),
                Err(error) => {
                    self.reporter.on_step_outcome(&label, Some(&error));
                    result.fail_unrun(1);
                }
            }
        }
    }
}
