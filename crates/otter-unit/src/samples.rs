//! Sample fixtures bundled with the `otter-unit` binary

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use otter_unit::{AssertionFailure, GlobalHooks, Hook, Registry, TestModule};

pub fn registry() -> Registry {
    Registry::new()
        .with_global_hooks(global_hooks())
        .with_fixture("sample/f2_fixture", lifecycle_fixture)
        .with_fixture("sample/async_fixture", async_fixture)
        .with_fixture("sample/counter_fixture", counter_fixture)
}

fn done() -> Hook {
    Hook::new(|ctx| {
        ctx.done();
        Ok(())
    })
}

fn global_hooks() -> GlobalHooks {
    GlobalHooks::new().with_set_up(done()).with_tear_down(done())
}

fn lifecycle_fixture() -> TestModule {
    TestModule::new()
        .with_set_up(done())
        .with_tear_down(done())
        .with_function("testA", done())
        .with_function("testB", done())
        .with_function("testC", done())
        .with_function(
            "nonTest",
            Hook::new(|_ctx| anyhow::bail!("not a test, never runs")),
        )
}

fn async_fixture() -> TestModule {
    TestModule::new()
        .with_fixture_set_up(Hook::from_async(|_ctx| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        }))
        .with_function(
            "testDeferredPass",
            Hook::new(|ctx| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    ctx.pass();
                });
                Ok(())
            }),
        )
        .with_function(
            "testLongerTimeout",
            Hook::from_async(|ctx| async move {
                ctx.set_timeout(3000);
                tokio::time::sleep(Duration::from_millis(1500)).await;
                Ok(())
            }),
        )
}

fn counter_fixture() -> TestModule {
    let counter = Arc::new(AtomicUsize::new(0));
    let reset = Arc::clone(&counter);
    let bump = Arc::clone(&counter);

    TestModule::new()
        .with_set_up(Hook::new(move |ctx| {
            reset.store(0, Ordering::SeqCst);
            ctx.pass();
            Ok(())
        }))
        .with_function(
            "testIncrement",
            Hook::new(move |ctx| {
                let value = bump.fetch_add(1, Ordering::SeqCst) + 1;
                if value != 1 {
                    return Err(AssertionFailure::new("==", value, 1)
                        .with_message("counter was not reset")
                        .into());
                }
                ctx.pass();
                Ok(())
            }),
        )
}
