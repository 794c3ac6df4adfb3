//! TOML configuration for the unit test runner

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::context::DEFAULT_TIMEOUT;
use crate::error::{HarnessError, HarnessResult};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "otter-unit.toml";

/// Runner configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Fixture search paths
    pub paths: Vec<PathBuf>,

    /// Run only the test with this exact name in each fixture
    pub test: Option<String>,

    /// Wait this long before starting the run
    pub delay_ms: Option<u64>,

    /// Timeout armed for every step, in milliseconds
    pub timeout_ms: u64,

    /// Report passing steps too
    pub verbose: bool,

    /// Print a JSON summary instead of console output
    pub json: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            test: None,
            delay_ms: None,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            verbose: false,
            json: false,
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::config(path, e))?;
        toml::from_str(&content).map_err(|e| HarnessError::config(path, e))
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists; fall
    /// back to defaults when neither can be read.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    return Self::default();
                }
                default_path
            }
        };

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", e);
                Self::default()
            }
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

/// Split a comma-separated path list. An empty list means the current
/// directory.
pub fn parse_path_list(list: &str) -> Vec<PathBuf> {
    let paths: Vec<PathBuf> = list
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect();
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    }
}
