//! Test modules: the loaded form of a fixture.
//!
//! A module exports optional lifecycle hooks plus named functions in
//! declaration order. Functions whose name starts with [`TEST_PREFIX`] are
//! tests; any other function is carried along but never executed.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::context::Context;
use crate::error::TestError;

/// Reserved prefix that marks a function as a test
pub const TEST_PREFIX: &str = "test";

/// Whether a function name is eligible to run as a test
pub fn is_test_name(name: &str) -> bool {
    name.starts_with(TEST_PREFIX)
}

type HookFn = dyn Fn(Context) -> anyhow::Result<()> + Send + Sync;

/// A lifecycle hook or test body.
///
/// The body receives the step's [`Context`] and must eventually call
/// `pass()` or `fail()` on it, either before returning or later from
/// another task. Returning an error (or panicking) fails the step.
#[derive(Clone)]
pub struct Hook(Arc<HookFn>);

impl Hook {
    /// Wrap a synchronous body
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(Context) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(body))
    }

    /// Wrap an async body. The future is spawned on the current runtime;
    /// resolving `Ok` passes the step, `Err` or a panic fails it.
    pub fn from_async<F, Fut>(body: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(move |ctx: Context| {
            let fut = body(ctx.clone());
            tokio::spawn(async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(())) => ctx.pass(),
                    Ok(Err(error)) => ctx.fail(error),
                    Err(payload) => ctx.fail(TestError::from_panic(payload)),
                }
            });
            Ok(())
        })
    }

    /// Invoke the body with `ctx`
    pub fn call(&self, ctx: Context) -> anyhow::Result<()> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// Hooks and functions exported by one fixture.
#[derive(Clone, Default)]
pub struct TestModule {
    fixture_set_up: Option<Hook>,
    fixture_tear_down: Option<Hook>,
    set_up: Option<Hook>,
    tear_down: Option<Hook>,
    functions: Vec<(String, Hook)>,
}

impl TestModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook run once before the fixture's tests
    pub fn with_fixture_set_up(mut self, hook: Hook) -> Self {
        self.fixture_set_up = Some(hook);
        self
    }

    /// Hook run once after the fixture's tests
    pub fn with_fixture_tear_down(mut self, hook: Hook) -> Self {
        self.fixture_tear_down = Some(hook);
        self
    }

    /// Hook run before every test
    pub fn with_set_up(mut self, hook: Hook) -> Self {
        self.set_up = Some(hook);
        self
    }

    /// Hook run after every passing test
    pub fn with_tear_down(mut self, hook: Hook) -> Self {
        self.tear_down = Some(hook);
        self
    }

    /// Export a named function. Re-exporting a name replaces the body but
    /// keeps its original position.
    pub fn with_function(mut self, name: impl Into<String>, hook: Hook) -> Self {
        let name = name.into();
        match self.functions.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = hook,
            None => self.functions.push((name, hook)),
        }
        self
    }

    pub fn fixture_set_up(&self) -> Option<&Hook> {
        self.fixture_set_up.as_ref()
    }

    pub fn fixture_tear_down(&self) -> Option<&Hook> {
        self.fixture_tear_down.as_ref()
    }

    pub fn set_up(&self) -> Option<&Hook> {
        self.set_up.as_ref()
    }

    pub fn tear_down(&self) -> Option<&Hook> {
        self.tear_down.as_ref()
    }

    /// Look up an exported function by name
    pub fn function(&self, name: &str) -> Option<&Hook> {
        self.functions
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, hook)| hook)
    }

    /// All exported function names in declaration order
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|(name, _)| name.as_str())
    }

    /// Tests to execute, in declaration order.
    ///
    /// With `selected`, only that exact name is eligible; if the module does
    /// not export it the list is empty.
    pub fn eligible_tests(&self, selected: Option<&str>) -> Vec<String> {
        self.function_names()
            .filter(|name| is_test_name(name))
            .filter(|name| selected.is_none_or(|wanted| *name == wanted))
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Debug for TestModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestModule")
            .field("fixture_set_up", &self.fixture_set_up.is_some())
            .field("fixture_tear_down", &self.fixture_tear_down.is_some())
            .field("set_up", &self.set_up.is_some())
            .field("tear_down", &self.tear_down.is_some())
            .field("functions", &self.function_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Suite-wide hooks, run once around all fixtures.
#[derive(Clone, Debug, Default)]
pub struct GlobalHooks {
    pub global_set_up: Option<Hook>,
    pub global_tear_down: Option<Hook>,
}

impl GlobalHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set_up(mut self, hook: Hook) -> Self {
        self.global_set_up = Some(hook);
        self
    }

    pub fn with_tear_down(mut self, hook: Hook) -> Self {
        self.global_tear_down = Some(hook);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn passing() -> Hook {
        Hook::new(|ctx| {
            ctx.pass();
            Ok(())
        })
    }

    fn sample_module() -> TestModule {
        TestModule::new()
            .with_function("testB", passing())
            .with_function("nonTest", passing())
            .with_function("testA", passing())
            .with_function("helper", passing())
    }

    #[test]
    fn test_eligible_tests_keep_declaration_order() {
        let module = sample_module();
        assert_eq!(module.eligible_tests(None), vec!["testB", "testA"]);
    }

    #[test]
    fn test_selected_test_restricts_to_exact_name() {
        let module = sample_module();
        assert_eq!(module.eligible_tests(Some("testA")), vec!["testA"]);
        assert!(module.eligible_tests(Some("testZ")).is_empty());
        // selecting a non-test export does not make it runnable
        assert!(module.eligible_tests(Some("nonTest")).is_empty());
    }

    #[test]
    fn test_reexport_keeps_position() {
        let module = sample_module().with_function("testB", passing());
        assert_eq!(
            module.function_names().collect::<Vec<_>>(),
            vec!["testB", "nonTest", "testA", "helper"]
        );
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert!(is_test_name("test"));
        assert!(is_test_name("testing"));
        assert!(!is_test_name("Test"));
        assert!(!is_test_name("myTest"));
    }

    #[tokio::test]
    async fn test_async_hook_resolution_passes() {
        let hook = Hook::from_async(|_ctx| async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(())
        });
        let ctx = Context::new();
        let target = ctx.clone();
        let outcome = ctx.run(move || hook.call(target)).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_async_hook_error_fails() {
        let hook = Hook::from_async(|_ctx| async { Err(anyhow::anyhow!("async boom")) });
        let ctx = Context::new();
        let target = ctx.clone();
        let outcome = ctx.run(move || hook.call(target)).await;
        assert_eq!(outcome.unwrap_err().to_string(), "async boom");
    }

    #[tokio::test]
    async fn test_async_hook_panic_fails() {
        let hook = Hook::from_async(|_ctx| async {
            if true {
                panic!("async panic");
            }
            Ok(())
        });
        let ctx = Context::new();
        let target = ctx.clone();
        let outcome = ctx.run(move || hook.call(target)).await;
        assert_eq!(outcome.unwrap_err().to_string(), "panicked: async panic");
    }
}
