//! Out-of-band error routing.
//!
//! The step runner records the context it is currently driving in an
//! [`ActiveContext`] slot. Errors that surface outside of any step's own
//! control flow (a panic in a task spawned by test code, for instance) are
//! routed through that slot: to the running context if there is one, or
//! reported as `uncaughtException` otherwise.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::Context;
use crate::error::{TestError, panic_message};
use crate::report::{Reporter, StepLabel};

/// Slot holding the context of the step currently running.
///
/// Written only by the step runner, one step at a time.
#[derive(Clone, Debug, Default)]
pub struct ActiveContext(Arc<Mutex<Option<Context>>>);

impl ActiveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn activate(&self, ctx: &Context) {
        *self.0.lock() = Some(ctx.clone());
    }

    /// Whether a step is running right now
    pub fn is_active(&self) -> bool {
        self.0.lock().as_ref().is_some_and(|ctx| !ctx.is_disposed())
    }

    /// Fail the running step with `error`, or report it as unattributed
    /// when no step is running.
    pub fn route(&self, error: TestError, reporter: &dyn Reporter) {
        let current = self.0.lock().clone();
        match current {
            Some(ctx) if !ctx.is_disposed() => {
                tracing::debug!(%error, "routing out-of-band error to active context");
                ctx.fail(error);
            }
            _ => {
                tracing::warn!(%error, "uncaught error outside of any step");
                reporter.on_step_outcome(&StepLabel::Uncaught, Some(&error));
            }
        }
    }
}

/// Chain a process panic hook that routes every panic through `active`.
///
/// The previously installed hook still runs first.
pub fn install_panic_hook(active: ActiveContext, reporter: Arc<dyn Reporter>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);
        let mut message = panic_message(info.payload());
        if let Some(location) = info.location() {
            message = format!("{} at {}:{}", message, location.file(), location.line());
        }
        active.route(TestError::Panic(message), reporter.as_ref());
    }));
}
