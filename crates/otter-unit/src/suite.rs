//! Suite orchestration: globalSetUp, every fixture in order, globalTearDown

use std::sync::Arc;
use std::time::Duration;

use crate::active::ActiveContext;
use crate::context::DEFAULT_TIMEOUT;
use crate::discovery::FixtureSource;
use crate::fixture::{FixtureInvoker, FixtureRef};
use crate::module::{GlobalHooks, Hook};
use crate::report::{Reporter, StepLabel};
use crate::result::RunResult;
use crate::step::StepRunner;

/// Runs a whole suite once and produces the total [`RunResult`].
///
/// Fixtures run one after another in the order given; fixture N+1 starts
/// only after fixture N's tearDown has completed.
pub struct SuiteOrchestrator {
    reporter: Arc<dyn Reporter>,
    steps: StepRunner,
    selected_test: Option<String>,
}

impl SuiteOrchestrator {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            steps: StepRunner::new(ActiveContext::new(), DEFAULT_TIMEOUT),
            selected_test: None,
        }
    }

    /// Restrict every fixture to the test with this exact name
    pub fn with_selected_test(mut self, test: Option<String>) -> Self {
        self.selected_test = test;
        self
    }

    /// Timeout armed for every step that does not set its own
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.steps = StepRunner::new(self.steps.active_context().clone(), timeout);
        self
    }

    /// Slot through which out-of-band errors reach the running step
    pub fn active_context(&self) -> &ActiveContext {
        self.steps.active_context()
    }

    pub async fn run(
        &self,
        source: &dyn FixtureSource,
        fixtures: &[FixtureRef],
        global: Option<&GlobalHooks>,
    ) -> RunResult {
        let mut total = RunResult::new();
        tracing::debug!(fixtures = fixtures.len(), "suite started");

        let set_up = global.and_then(|hooks| hooks.global_set_up.as_ref());
        if self.run_global(StepLabel::GlobalSetUp, set_up, &mut total).await {
            let invoker = FixtureInvoker::new(
                &self.steps,
                self.reporter.as_ref(),
                self.selected_test.as_deref(),
            );
            for fixture in fixtures {
                total += invoker.run(fixture, source).await;
            }

            let tear_down = global.and_then(|hooks| hooks.global_tear_down.as_ref());
            self.run_global(StepLabel::GlobalTearDown, tear_down, &mut total)
                .await;
        }

        tracing::debug!(
            total = total.total,
            passed = total.passed,
            failed = total.failed,
            "suite finished"
        );
        self.reporter.on_suite_done(&total);
        total
    }

    /// Run an optional global hook. A failure counts once against the total.
    async fn run_global(&self, label: StepLabel, hook: Option<&Hook>, total: &mut RunResult) -> bool {
        let Some(hook) = hook else {
            return true;
        };
        match self.steps.run(&label, hook).await {
            Ok(()) => {
                self.reporter.on_step_outcome(&label, None);
                true
            }
            Err(error) => {
                total.failed += 1;
                self.reporter.on_step_outcome(&label, Some(&error));
                false
            }
        }
    }
}
