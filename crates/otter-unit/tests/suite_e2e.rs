//! End-to-end runs of whole suites through the public API

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use otter_unit::cli::exit_status;
use otter_unit::{
    AssertionFailure, FixtureSource, GlobalHooks, Hook, RecordingReporter, Registry, RunResult,
    SuiteOrchestrator, TestModule,
};

fn passing() -> Hook {
    Hook::new(|ctx| {
        ctx.pass();
        Ok(())
    })
}

fn counted(counter: &Arc<AtomicUsize>) -> Hook {
    let counter = Arc::clone(counter);
    Hook::new(move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.pass();
        Ok(())
    })
}

async fn run_suite(registry: &Registry, selected: Option<&str>) -> (RunResult, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::new());
    let fixtures = registry.discover(&[PathBuf::from(".")]);
    let global = registry.global_hooks();
    let result = SuiteOrchestrator::new(reporter.clone())
        .with_selected_test(selected.map(str::to_string))
        .run(registry, &fixtures, global.as_ref())
        .await;
    (result, reporter)
}

fn counters(result: &RunResult) -> (usize, usize, usize) {
    (result.total, result.passed, result.failed)
}

#[tokio::test]
async fn test_pass_and_thrown_error() {
    let registry = Registry::new().with_fixture("e2e/mixed_fixture", || {
        TestModule::new()
            .with_function("testA", passing())
            .with_function("testB", Hook::new(|_ctx| anyhow::bail!("plain error")))
    });

    let (result, reporter) = run_suite(&registry, None).await;

    assert_eq!(counters(&result), (2, 1, 1));
    assert_eq!(exit_status(&result), 1);
    assert_eq!(
        reporter.failures(),
        vec![("testB".to_string(), "plain error".to_string())]
    );
}

#[tokio::test]
async fn test_throwing_set_up_fails_every_test_without_running_bodies() {
    let bodies = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&bodies);
    let registry = Registry::new().with_fixture("e2e/setup_fixture", move || {
        TestModule::new()
            .with_set_up(Hook::new(|_ctx| panic!("setUp exploded")))
            .with_function("testA", counted(&counter))
            .with_function("testB", counted(&counter))
    });

    let (result, reporter) = run_suite(&registry, None).await;

    assert_eq!(counters(&result), (2, 0, 2));
    assert_eq!(bodies.load(Ordering::SeqCst), 0);
    let labels: Vec<String> = reporter.failures().into_iter().map(|(label, _)| label).collect();
    assert_eq!(labels, vec!["testA ---> setUp", "testB ---> setUp"]);
}

#[tokio::test]
async fn test_failing_global_set_up_loads_no_fixture() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let registry = Registry::new()
        .with_global_hooks(
            GlobalHooks::new().with_set_up(Hook::new(|ctx| {
                ctx.fail(otter_unit::TestError::msg("no database"));
                Ok(())
            })),
        )
        .with_fixture("e2e/never_fixture", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            TestModule::new().with_function("testA", passing())
        });

    let (result, _) = run_suite(&registry, None).await;

    assert_eq!(counters(&result), (0, 0, 1));
    assert_eq!(exit_status(&result), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_silent_test_times_out_after_default_window() {
    let registry = Registry::new().with_fixture("e2e/silent_fixture", || {
        TestModule::new()
            .with_function("testSilent", Hook::new(|_ctx| Ok(())))
            .with_function("testAfter", passing())
    });
    let started = tokio::time::Instant::now();

    let (result, reporter) = run_suite(&registry, None).await;

    assert_eq!(counters(&result), (2, 1, 1));
    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert!(started.elapsed() < Duration::from_millis(1100));
    assert_eq!(
        reporter.failures(),
        vec![("testSilent".to_string(), "timeout 1000 ms.".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_async_completion_and_custom_timeout() {
    let registry = Registry::new().with_fixture("e2e/async_fixture", || {
        TestModule::new()
            .with_function(
                "testDeferred",
                Hook::new(|ctx| {
                    ctx.set_timeout(5000);
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(2500)).await;
                        ctx.pass();
                    });
                    Ok(())
                }),
            )
            .with_function(
                "testTooSlow",
                Hook::from_async(|ctx| async move {
                    ctx.set_timeout(100);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(())
                }),
            )
    });

    let (result, reporter) = run_suite(&registry, None).await;

    assert_eq!(counters(&result), (2, 1, 1));
    assert_eq!(
        reporter.failures(),
        vec![("testTooSlow".to_string(), "timeout 100 ms.".to_string())]
    );
}

#[tokio::test]
async fn test_assertion_failure_keeps_detail() {
    let registry = Registry::new().with_fixture("e2e/assert_fixture", || {
        TestModule::new().with_function(
            "testEqual",
            Hook::new(|_ctx| Err(AssertionFailure::new("==", 1, 2).with_message("failed").into())),
        )
    });

    let (result, reporter) = run_suite(&registry, None).await;

    assert_eq!(counters(&result), (1, 0, 1));
    assert_eq!(
        reporter.failures(),
        vec![("testEqual".to_string(), "failed".to_string())]
    );
}

#[tokio::test]
async fn test_unknown_selected_test_is_not_an_error() {
    let registry = Registry::new()
        .with_fixture("e2e/a_fixture", || TestModule::new().with_function("testA", passing()))
        .with_fixture("e2e/b_fixture", || TestModule::new().with_function("testB", passing()));

    let (result, _) = run_suite(&registry, Some("testB")).await;
    assert_eq!(counters(&result), (1, 1, 0));

    let (result, _) = run_suite(&registry, Some("testMissing")).await;
    assert_eq!(counters(&result), (0, 0, 0));
    assert_eq!(exit_status(&result), 0);
}

#[tokio::test]
async fn test_double_completion_counts_once() {
    let body_runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&body_runs);
    let registry = Registry::new().with_fixture("e2e/double_fixture", move || {
        let counter = Arc::clone(&counter);
        TestModule::new().with_function(
            "testTwice",
            Hook::new(move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                ctx.pass();
                ctx.pass();
                ctx.fail(otter_unit::TestError::msg("too late"));
                Ok(())
            }),
        )
    });

    let (result, reporter) = run_suite(&registry, None).await;

    assert_eq!(counters(&result), (1, 1, 0));
    assert_eq!(body_runs.load(Ordering::SeqCst), 1);
    // Only the first completion reaches the reporter.
    assert_eq!(reporter.step_labels(), vec!["testTwice"]);
    assert!(reporter.failures().is_empty());
}
