//! Reporting of run progress and results.
//!
//! The harness pushes events into a [`Reporter`] as they happen and never
//! reads anything back. [`ConsoleReporter`] renders them for humans,
//! [`RecordingReporter`] keeps them in memory.

use std::fmt;
use std::io::{self, Write};

use colored::Colorize;
use parking_lot::Mutex;

use crate::error::TestError;
use crate::fixture::FixtureRef;
use crate::result::RunResult;

/// Identifies which lifecycle step an outcome belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepLabel {
    /// Test body
    Test(String),
    /// Per-test setUp of the named test
    SetUp(String),
    /// Per-test tearDown of the named test
    TearDown(String),
    FixtureSetUp,
    FixtureTearDown,
    /// Fixture reference could not be loaded
    FixtureLoad,
    GlobalSetUp,
    GlobalTearDown,
    /// Error raised while no step was active
    Uncaught,
}

impl fmt::Display for StepLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test(name) => f.write_str(name),
            Self::SetUp(name) => write!(f, "{} ---> setUp", name),
            Self::TearDown(name) => write!(f, "{} ---> tearDown", name),
            Self::FixtureSetUp => f.write_str("fixtureSetUp"),
            Self::FixtureTearDown => f.write_str("fixtureTearDown"),
            Self::FixtureLoad => f.write_str("fixtureLoad"),
            Self::GlobalSetUp => f.write_str("globalSetUp"),
            Self::GlobalTearDown => f.write_str("globalTearDown"),
            Self::Uncaught => f.write_str("uncaughtException"),
        }
    }
}

/// Sink for run events.
pub trait Reporter: Send + Sync {
    fn on_version(&self);

    fn on_fixture_start(&self, fixture: &FixtureRef);

    /// Called once per executed step; `error` is `None` when it passed
    fn on_step_outcome(&self, label: &StepLabel, error: Option<&TestError>);

    fn on_fixture_done(&self, fixture: &FixtureRef, result: &RunResult);

    fn on_suite_done(&self, result: &RunResult);
}

/// `"<total> tests, <passed> passed, <failed> failed, took <ms>ms."`
pub fn format_counts(result: &RunResult) -> String {
    format!(
        "{} tests, {} passed, {} failed, took {}ms.",
        result.total,
        result.passed,
        result.failed,
        result.duration_ms()
    )
}

/// Human-readable output, on stdout unless another writer is given.
///
/// Write errors are dropped so that a closed pipe never turns reporting
/// into a panic, including when the panic hook is the one reporting.
pub struct ConsoleReporter {
    verbose: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

macro_rules! say {
    ($reporter:expr, $($arg:tt)*) => {
        $reporter.emit(format_args!($($arg)*))
    };
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(verbose, io::stdout())
    }

    pub fn with_writer(verbose: bool, out: impl Write + Send + 'static) -> Self {
        Self {
            verbose,
            out: Mutex::new(Box::new(out)),
        }
    }

    fn emit(&self, line: fmt::Arguments<'_>) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{}", line).and_then(|()| out.flush());
    }
}

impl fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleReporter")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl Reporter for ConsoleReporter {
    fn on_version(&self) {
        say!(self, "\n{} {}", "otter-unit version:".bold().cyan(), env!("CARGO_PKG_VERSION"));
    }

    fn on_fixture_start(&self, fixture: &FixtureRef) {
        say!(self, "\n\n------ Fixture start --------------------");
        say!(self, "{}", fixture.as_str().bold());
        say!(self, "-----------------------------------------\n\n");
    }

    fn on_step_outcome(&self, label: &StepLabel, error: Option<&TestError>) {
        let Some(error) = error else {
            if self.verbose {
                say!(self, "\n>> Test '{}' {}", label, "Passed.".green());
            }
            return;
        };

        say!(self, "\n>> Test '{}' {}", label, "failed.".red().bold());
        if let Some(assertion) = error.assertion() {
            say!(self, "    message: {}", assertion.message);
            say!(self, "    actual: {}", assertion.actual);
            say!(self, "    expected: {}", assertion.expected);
            say!(self, "    operator: {}", assertion.operator);
        }
        match error {
            TestError::Other(inner) => say!(self, "    {:#}", inner),
            _ => say!(self, "    {}", error),
        }
    }

    fn on_fixture_done(&self, _fixture: &FixtureRef, result: &RunResult) {
        say!(self, "\n\n------ Fixture end ----------------------");
        say!(self, "{}", format_counts(result));
        say!(self, "-----------------------------------------");
    }

    fn on_suite_done(&self, result: &RunResult) {
        let line = format!("========== Total: {}  ==========", format_counts(result));
        if result.is_success() {
            say!(self, "\n\n{}\n\n", line.green().bold());
        } else {
            say!(self, "\n\n{}\n\n", line.red().bold());
        }
    }
}

/// Event captured by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Version,
    FixtureStart(FixtureRef),
    Step { label: StepLabel, error: Option<String> },
    FixtureDone(FixtureRef, RunResult),
    SuiteDone(RunResult),
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().clone()
    }

    /// Labels of every reported step, passed or failed
    pub fn step_labels(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Step { label, .. } => Some(label.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Labels of failed steps, with their error messages
    pub fn failures(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Step {
                    label,
                    error: Some(error),
                } => Some((label.to_string(), error.clone())),
                _ => None,
            })
            .collect()
    }

    /// Result passed to `on_suite_done`, if the run finished
    pub fn suite_result(&self) -> Option<RunResult> {
        self.events.lock().iter().rev().find_map(|event| match event {
            ReportEvent::SuiteDone(result) => Some(*result),
            _ => None,
        })
    }

    fn push(&self, event: ReportEvent) {
        self.events.lock().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn on_version(&self) {
        self.push(ReportEvent::Version);
    }

    fn on_fixture_start(&self, fixture: &FixtureRef) {
        self.push(ReportEvent::FixtureStart(fixture.clone()));
    }

    fn on_step_outcome(&self, label: &StepLabel, error: Option<&TestError>) {
        self.push(ReportEvent::Step {
            label: label.clone(),
            error: error.map(ToString::to_string),
        });
    }

    fn on_fixture_done(&self, fixture: &FixtureRef, result: &RunResult) {
        self.push(ReportEvent::FixtureDone(fixture.clone(), *result));
    }

    fn on_suite_done(&self, result: &RunResult) {
        self.push(ReportEvent::SuiteDone(*result));
    }
}
