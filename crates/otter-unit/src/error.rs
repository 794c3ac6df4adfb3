//! Error types for otter-unit
//!
//! `TestError` is what a lifecycle step fails with. `HarnessError` covers the
//! plumbing around the run (loading fixtures, reading configuration).

use std::any::Any;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Reason a lifecycle step failed.
#[derive(Error, Debug)]
pub enum TestError {
    /// Structured assertion failure (expected/actual/operator)
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    /// No completion arrived within the armed window
    #[error("timeout {ms} ms.")]
    Timeout { ms: u64 },

    /// Step panicked
    #[error("panicked: {0}")]
    Panic(String),

    /// Named test function is not exported by the module
    #[error("test '{0}' is not defined in this module")]
    MissingTest(String),

    /// Context was dropped before pass or fail fired
    #[error("context dropped before completion")]
    Abandoned,

    /// Any other error returned by test code
    #[error(transparent)]
    Other(anyhow::Error),
}

impl TestError {
    /// Create a plain failure from a message
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::Other(anyhow::anyhow!("{}", message))
    }

    /// Build a failure from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panic(panic_message(payload.as_ref()))
    }

    /// Assertion detail, if this is an assertion-style failure
    pub fn assertion(&self) -> Option<&AssertionFailure> {
        match self {
            Self::Assertion(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<anyhow::Error> for TestError {
    fn from(error: anyhow::Error) -> Self {
        // Test code usually bubbles errors up through `anyhow`; recover the
        // structured variants so reporting keeps their detail.
        let error = match error.downcast::<TestError>() {
            Ok(inner) => return inner,
            Err(error) => error,
        };
        match error.downcast::<AssertionFailure>() {
            Ok(failure) => Self::Assertion(failure),
            Err(error) => Self::Other(error),
        }
    }
}

/// Assertion-style failure carrying the compared values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AssertionFailure {
    pub message: String,
    pub actual: String,
    pub expected: String,
    pub operator: String,
}

impl AssertionFailure {
    /// Create a failure for `actual <operator> expected`
    pub fn new(operator: impl Into<String>, actual: impl fmt::Debug, expected: impl fmt::Debug) -> Self {
        let operator = operator.into();
        let actual = format!("{:?}", actual);
        let expected = format!("{:?}", expected);
        Self {
            message: format!("{} {} {}", actual, operator, expected),
            actual,
            expected,
            operator,
        }
    }

    /// Replace the generated message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Errors from the harness plumbing (not from test code)
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Fixture reference does not resolve to a registered module
    #[error("Fixture not found: {0}")]
    FixtureNotFound(String),

    /// Configuration file could not be read or parsed
    #[error("Config error in '{}': {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub fn config(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type using HarnessError
pub type HarnessResult<T> = Result<T, HarnessError>;

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown".to_string()
    }
}
