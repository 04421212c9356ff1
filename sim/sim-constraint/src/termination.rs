//! Termination policies for the iterative solve.
//!
//! `solve` asks its policy before every pass whether to stop. Any
//! `FnMut(&ComputationStatistics) -> bool` closure is a policy; the
//! [`DefaultTerminator`] stops on a time budget or on convergence of the
//! multiplier changes.

use std::time::Duration;

use crate::ComputationStatistics;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decides when the Gauss-Seidel iteration stops.
pub trait TerminationPolicy {
    /// Return `true` to stop before the next pass.
    fn should_terminate(&mut self, statistics: &ComputationStatistics) -> bool;
}

impl<F> TerminationPolicy for F
where
    F: FnMut(&ComputationStatistics) -> bool,
{
    fn should_terminate(&mut self, statistics: &ComputationStatistics) -> bool {
        self(statistics)
    }
}

/// Stop when any of these holds after at least one pass:
///
/// - the solve has run for `max_time` or longer,
/// - the last pass changed no multiplier by more than `min_change`,
/// - the max change moved by no more than `min_change_delta` between passes.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sim_constraint::{ComputationStatistics, DefaultTerminator, TerminationPolicy};
///
/// let mut terminator = DefaultTerminator::new(Duration::from_millis(2), 1e-4, 1e-6);
///
/// let mut stats = ComputationStatistics::new(10);
/// assert!(!terminator.should_terminate(&stats)); // no pass yet
///
/// stats.record_pass(1e-5, 0, Duration::ZERO, Duration::ZERO);
/// assert!(terminator.should_terminate(&stats)); // converged
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DefaultTerminator {
    /// Time budget for one solve.
    pub max_time: Duration,
    /// Convergence threshold on the largest multiplier change of a pass.
    pub min_change: f32,
    /// Stagnation threshold on the pass-to-pass difference of that change.
    pub min_change_delta: f32,
}

impl Default for DefaultTerminator {
    fn default() -> Self {
        Self {
            max_time: Duration::from_millis(5),
            min_change: 1e-5,
            min_change_delta: 1e-7,
        }
    }
}

impl DefaultTerminator {
    /// Create a terminator with explicit thresholds.
    #[must_use]
    pub const fn new(max_time: Duration, min_change: f32, min_change_delta: f32) -> Self {
        Self {
            max_time,
            min_change,
            min_change_delta,
        }
    }
}

impl TerminationPolicy for DefaultTerminator {
    fn should_terminate(&mut self, statistics: &ComputationStatistics) -> bool {
        default_computation_terminator(
            statistics,
            self.max_time,
            self.min_change,
            self.min_change_delta,
        )
    }
}

/// The default termination predicate.
///
/// Never stops before the first pass, because the change fields are still
/// zero at that point.
#[must_use]
pub fn default_computation_terminator(
    statistics: &ComputationStatistics,
    max_time: Duration,
    min_change: f32,
    min_change_delta: f32,
) -> bool {
    if statistics.num_performed_iterations == 0 {
        return false;
    }
    statistics.total_time >= max_time
        || statistics.max_change_of_variables <= min_change
        || statistics.change_of_max_change_of_variables <= min_change_delta
}
