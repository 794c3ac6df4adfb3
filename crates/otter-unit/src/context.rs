//! Execution context: the single-use completion token handed to every
//! lifecycle step.
//!
//! A context is created fresh for each step, armed by [`Context::start`],
//! and disposed exactly once when the step passes, fails, or times out.
//! Clones share the same state, so test code may move a clone into a
//! spawned task and complete the step from there.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::TestError;

/// Timeout armed by [`Context::start`] unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

type StartFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;
type PassedFn = Box<dyn FnOnce() + Send>;
type FailedFn = Box<dyn FnOnce(TestError) + Send>;

/// How a disposed context completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Passed,
    Failed,
    TimedOut,
}

/// Lifecycle state of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Callbacks may be registered; no start action has run yet
    Created,
    /// Started, timer running
    Armed,
    /// Terminal
    Disposed(Completion),
}

struct Inner {
    state: ContextState,
    default_timeout: Duration,
    timeout: Option<Duration>,
    timer: Option<JoinHandle<()>>,
    on_start: Option<StartFn>,
    on_passed: Option<PassedFn>,
    on_failed: Option<FailedFn>,
}

impl Inner {
    /// Mark the context disposed. Returns false if it already was.
    fn dispose(&mut self, completion: Completion, abort_timer: bool) -> bool {
        if matches!(self.state, ContextState::Disposed(_)) {
            return false;
        }
        self.state = ContextState::Disposed(completion);
        if let Some(timer) = self.timer.take() {
            if abort_timer {
                timer.abort();
            }
        }
        self.on_start = None;
        true
    }
}

/// Completion token for one lifecycle step.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Mutex<Inner>>,
    runtime: Handle,
}

impl Context {
    /// Create a context armed with [`DEFAULT_TIMEOUT`] on start.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new() -> Self {
        Self::with_default_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a context that arms `timeout` on start.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ContextState::Created,
                default_timeout: timeout,
                timeout: None,
                timer: None,
                on_start: None,
                on_passed: None,
                on_failed: None,
            })),
            runtime: Handle::current(),
        }
    }

    /// Register the start action. Replaces any previous registration.
    pub fn on_start<F>(&self, action: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.inner.lock().on_start = Some(Box::new(action));
    }

    /// Register the passed callback. Replaces any previous registration.
    pub fn on_passed<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock().on_passed = Some(Box::new(callback));
    }

    /// Register the failed callback. Replaces any previous registration.
    pub fn on_failed<F>(&self, callback: F)
    where
        F: FnOnce(TestError) + Send + 'static,
    {
        self.inner.lock().on_failed = Some(Box::new(callback));
    }

    /// Arm the default timeout and run the start action.
    ///
    /// An error returned from the action, or a panic inside it, fails the
    /// context; nothing escapes this call. Starting twice is a no-op.
    pub fn start(&self) {
        let (action, default_timeout) = {
            let mut inner = self.inner.lock();
            if inner.state != ContextState::Created {
                tracing::trace!(state = ?inner.state, "context already started");
                return;
            }
            inner.state = ContextState::Armed;
            (inner.on_start.take(), inner.default_timeout)
        };

        self.arm(default_timeout);

        let Some(action) = action else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(action)) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => self.fail(error),
            Err(payload) => self.fail(TestError::from_panic(payload)),
        }
    }

    /// Replace the running timer with one that fires `ms` milliseconds from now.
    pub fn set_timeout(&self, ms: u64) {
        self.arm(Duration::from_millis(ms));
    }

    /// Currently armed timeout window.
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.lock().timeout
    }

    /// Complete the step successfully. No-op once disposed.
    pub fn pass(&self) {
        let callback = {
            let mut inner = self.inner.lock();
            if !inner.dispose(Completion::Passed, true) {
                return;
            }
            inner.on_failed = None;
            inner.on_passed.take()
        };
        tracing::trace!("context passed");
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Alias for [`Context::pass`].
    pub fn done(&self) {
        self.pass();
    }

    /// Fail the step with `error`. No-op once disposed.
    pub fn fail(&self, error: impl Into<TestError>) {
        self.complete_failed(error.into(), Completion::Failed, true);
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.inner.lock().state, ContextState::Disposed(_))
    }

    pub fn state(&self) -> ContextState {
        self.inner.lock().state
    }

    /// Register pass/fail callbacks around `action`, start the context and
    /// wait for whichever completion fires.
    pub async fn run<F>(&self, action: F) -> Result<(), TestError>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let on_fail = Arc::new(Mutex::new(Some(tx)));
        let on_pass = Arc::clone(&on_fail);

        self.on_passed(move || {
            if let Some(tx) = on_pass.lock().take() {
                let _ = tx.send(Ok(()));
            }
        });
        self.on_failed(move |error| {
            if let Some(tx) = on_fail.lock().take() {
                let _ = tx.send(Err(error));
            }
        });
        self.on_start(action);
        self.start();

        rx.await.unwrap_or(Err(TestError::Abandoned))
    }

    fn arm(&self, duration: Duration) {
        let mut inner = self.inner.lock();
        if matches!(inner.state, ContextState::Disposed(_)) {
            return;
        }
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.timeout = Some(duration);

        let ctx = self.clone();
        inner.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            let ms = duration.as_millis() as u64;
            tracing::debug!(ms, "context timed out");
            ctx.complete_failed(TestError::Timeout { ms }, Completion::TimedOut, false);
        }));
    }

    fn complete_failed(&self, error: TestError, completion: Completion, abort_timer: bool) {
        let callback = {
            let mut inner = self.inner.lock();
            if !inner.dispose(completion, abort_timer) {
                return;
            }
            inner.on_passed = None;
            inner.on_failed.take()
        };
        tracing::trace!(%error, "context failed");
        if let Some(callback) = callback {
            callback(error);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Context")
            .field("state", &inner.state)
            .field("timeout", &inner.timeout)
            .finish()
    }
}
