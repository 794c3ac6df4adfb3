//! Command-line entry point shared by every runner binary.
//!
//! A test crate builds a [`Registry`] of its fixtures and hands it to
//! [`main_with`]; argument parsing, configuration, reporting and the exit
//! status are handled here.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::filter::EnvFilter;

use crate::active::install_panic_hook;
use crate::config::{RunConfig, parse_path_list};
use crate::discovery::{FixtureSource, Registry};
use crate::fixture::FixtureRef;
use crate::report::{ConsoleReporter, RecordingReporter, Reporter};
use crate::result::RunResult;
use crate::suite::SuiteOrchestrator;

#[derive(Parser, Debug, Default)]
#[command(name = "otter-unit")]
#[command(about = "Run fixture-based unit tests", disable_version_flag = true)]
pub struct Args {
    /// Comma-separated fixture search paths (default: ".")
    #[arg(long, value_name = "PATHS")]
    pub path: Option<String>,

    /// Run only the test with this exact name in each fixture
    #[arg(long, value_name = "NAME")]
    pub test: Option<String>,

    /// Delay before the run starts, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay: Option<u64>,

    /// Default timeout per step, in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Report passing steps too
    #[arg(short, long)]
    pub verbose: bool,

    /// Output a JSON summary instead of console output
    #[arg(long)]
    pub json: bool,

    /// List discovered fixtures and their tests without running them
    #[arg(long)]
    pub list: bool,

    /// Path to a TOML config file (default: otter-unit.toml if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print version and exit
    #[arg(short = 'V', long)]
    pub version: bool,
}

impl Args {
    /// Overlay command-line values on top of `config`.
    pub fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(ref path) = self.path {
            config.paths = parse_path_list(path);
        }
        if self.test.is_some() {
            config.test = self.test.clone();
        }
        if self.delay.is_some() {
            config.delay_ms = self.delay;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_ms = timeout;
        }
        config.verbose |= self.verbose;
        config.json |= self.json;
        config
    }
}

/// Process exit status for a finished run: the failure count, capped to
/// what an exit code can carry.
pub fn exit_status(result: &RunResult) -> u8 {
    result.failed.min(u8::MAX as usize) as u8
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    #[serde(flatten)]
    result: &'a RunResult,
    fixtures: Vec<FixtureRef>,
    failures: Vec<JsonFailure>,
    finished_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct JsonFailure {
    step: String,
    error: String,
}

/// Parse arguments, run every fixture in `registry` and map the result to
/// the process exit status.
pub fn main_with(registry: Registry) -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();

    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(args, registry))
}

/// Run with already parsed arguments
pub async fn run(args: Args, registry: Registry) -> ExitCode {
    let config = args.apply(RunConfig::load_or_default(args.config.as_deref()));

    if args.version || !config.json {
        ConsoleReporter::new(config.verbose).on_version();
    }
    if args.version {
        return ExitCode::SUCCESS;
    }

    let fixtures = registry.discover(&config.paths);

    if args.list {
        print_listing(&registry, &fixtures, config.test.as_deref());
        return ExitCode::SUCCESS;
    }

    let recorder = Arc::new(RecordingReporter::new());
    let reporter: Arc<dyn Reporter> = if config.json {
        recorder.clone()
    } else {
        Arc::new(ConsoleReporter::new(config.verbose))
    };

    let orchestrator = SuiteOrchestrator::new(Arc::clone(&reporter))
        .with_selected_test(config.test.clone())
        .with_default_timeout(config.default_timeout());
    install_panic_hook(orchestrator.active_context().clone(), Arc::clone(&reporter));

    if let Some(delay) = config.delay() {
        tracing::debug!(?delay, "delaying run");
        tokio::time::sleep(delay).await;
    }

    let global = registry.global_hooks();
    let result = orchestrator.run(&registry, &fixtures, global.as_ref()).await;

    if config.json {
        let summary = JsonSummary {
            result: &result,
            fixtures,
            failures: recorder
                .failures()
                .into_iter()
                .map(|(step, error)| JsonFailure { step, error })
                .collect(),
            finished_at: Utc::now(),
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to generate JSON: {}", e),
        }
    }

    ExitCode::from(exit_status(&result))
}

fn print_listing(source: &dyn FixtureSource, fixtures: &[FixtureRef], selected: Option<&str>) {
    for fixture in fixtures {
        println!("{}", fixture);
        match source.load(fixture) {
            Ok(module) => {
                for test in module.eligible_tests(selected) {
                    println!("  {}", test);
                }
            }
            Err(e) => println!("  <{}>", e),
        }
    }
    println!("\nTotal: {} fixtures", fixtures.len());
}
