//! Aggregated pass/fail counters

use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Counters for a fixture or a whole run.
///
/// Hook failures may raise `failed` (and `total`) for tests that never
/// executed, so `passed + failed` can reach `total` without every test
/// having run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Number of tests accounted for
    pub total: usize,
    /// Tests that passed every executed step
    pub passed: usize,
    /// Tests or hooks that failed
    pub failed: usize,
    /// Wall-clock time spent
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one executed test
    pub fn record(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Count `count` tests as failed without running them
    pub fn fail_unrun(&mut self, count: usize) {
        self.total += count;
        self.failed += count;
    }

    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl Add for RunResult {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for RunResult {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.passed += rhs.passed;
        self.failed += rhs.failed;
        self.duration += rhs.duration;
    }
}

impl Sum for RunResult {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
