//! Per-test lifecycle: setUp, body, tearDown

use crate::error::TestError;
use crate::module::TestModule;
use crate::report::{Reporter, StepLabel};
use crate::step::StepRunner;

/// Runs one named test of a module.
///
/// Steps run strictly in order and each one is reported. The first failing
/// step concludes the test: a failing setUp skips the body and tearDown, and
/// a failing body skips tearDown as well.
pub struct TestInvoker<'a> {
    steps: &'a StepRunner,
    reporter: &'a dyn Reporter,
}

impl<'a> TestInvoker<'a> {
    pub fn new(steps: &'a StepRunner, reporter: &'a dyn Reporter) -> Self {
        Self { steps, reporter }
    }

    /// Returns whether every executed step passed.
    pub async fn run(&self, module: &TestModule, test_name: &str) -> bool {
        if let Some(set_up) = module.set_up() {
            let label = StepLabel::SetUp(test_name.to_string());
            let outcome = self.steps.run(&label, set_up).await;
            if !self.report(&label, outcome) {
                return false;
            }
        }

        let label = StepLabel::Test(test_name.to_string());
        let outcome = match module.function(test_name) {
            Some(body) => self.steps.run(&label, body).await,
            None => Err(TestError::MissingTest(test_name.to_string())),
        };
        if !self.report(&label, outcome) {
            return false;
        }

        if let Some(tear_down) = module.tear_down() {
            let label = StepLabel::TearDown(test_name.to_string());
            let outcome = self.steps.run(&label, tear_down).await;
            if !self.report(&label, outcome) {
                return false;
            }
        }

        true
    }

    fn report(&self, label: &StepLabel, outcome: Result<(), TestError>) -> bool {
        match outcome {
            Ok(()) => {
                self.reporter.on_step_outcome(label, None);
                true
            }
            Err(error) => {
                self.reporter.on_step_outcome(label, Some(&error));
                false
            }
        }
    }
}
