//! Running a single lifecycle step in a fresh context

use std::time::Duration;

use crate::active::ActiveContext;
use crate::context::{Context, DEFAULT_TIMEOUT};
use crate::error::TestError;
use crate::module::Hook;
use crate::report::StepLabel;

/// Drives one hook at a time, each in its own [`Context`].
#[derive(Clone, Debug)]
pub struct StepRunner {
    active: ActiveContext,
    default_timeout: Duration,
}

impl Default for StepRunner {
    fn default() -> Self {
        Self::new(ActiveContext::new(), DEFAULT_TIMEOUT)
    }
}

impl StepRunner {
    pub fn new(active: ActiveContext, default_timeout: Duration) -> Self {
        Self {
            active,
            default_timeout,
        }
    }

    pub fn active_context(&self) -> &ActiveContext {
        &self.active
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `hook` to completion. Resolves once the step's context has
    /// passed, failed, or timed out.
    pub async fn run(&self, label: &StepLabel, hook: &Hook) -> Result<(), TestError> {
        tracing::debug!(step = %label, "step started");

        let ctx = Context::with_default_timeout(self.default_timeout);
        self.active.activate(&ctx);

        let hook = hook.clone();
        let target = ctx.clone();
        let outcome = ctx.run(move || hook.call(target)).await;

        match &outcome {
            Ok(()) => tracing::debug!(step = %label, "step passed"),
            Err(error) => tracing::debug!(step = %label, %error, "step failed"),
        }
        outcome
    }
}
