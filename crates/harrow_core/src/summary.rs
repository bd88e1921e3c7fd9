//! Execution statistics rolled up from tests to the assembly.

use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::time::Duration;

/// Counts and elapsed time for one level of a run.
///
/// A summary is created fresh by each level, mutated only by that level, and returned to the parent,
/// which folds it into its own summary with [`ExecutionSummary::aggregate`].
///
/// ## Notes
/// - `time` is a [`Duration`] so aggregation stays exact (and therefore associative).
/// - `continue_run` is `false` once any message of the level (or of a child) was rejected by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub total: u32,
    pub failed: u32,
    pub skipped: u32,
    pub time: Duration,
    pub continue_run: bool,
}

impl Default for ExecutionSummary {
    fn default() -> Self {
        Self {
            total: 0,
            failed: 0,
            skipped: 0,
            time: Duration::ZERO,
            continue_run: true,
        }
    }
}

impl ExecutionSummary {
    /// Create an empty summary (the aggregation identity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary of a single test that has been counted but not yet resolved.
    pub fn single() -> Self {
        Self {
            total: 1,
            ..Self::default()
        }
    }

    /// Fold `other` into `self` component-wise.
    pub fn aggregate(&mut self, other: &ExecutionSummary) {
        self.total += other.total;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.time += other.time;
        self.continue_run &= other.continue_run;
    }

    /// Number of tests that neither failed nor were skipped.
    pub fn passed(&self) -> u32 {
        self.total.saturating_sub(self.failed + self.skipped)
    }

    /// Check `failed + skipped <= total`.
    pub fn is_consistent(&self) -> bool {
        self.failed + self.skipped <= self.total
    }

    /// Elapsed time in (fractional) seconds, the unit used on the wire.
    pub fn seconds(&self) -> f64 {
        self.time.as_secs_f64()
    }
}

impl AddAssign<&ExecutionSummary> for ExecutionSummary {
    fn add_assign(&mut self, rhs: &ExecutionSummary) {
        self.aggregate(rhs);
    }
}

impl Add for ExecutionSummary {
    type Output = ExecutionSummary;

    fn add(mut self, rhs: ExecutionSummary) -> ExecutionSummary {
        self.aggregate(&rhs);
        self
    }
}

impl Sum for ExecutionSummary {
    fn sum<I: Iterator<Item = ExecutionSummary>>(iter: I) -> Self {
        iter.fold(ExecutionSummary::new(), Add::add)
    }
}
