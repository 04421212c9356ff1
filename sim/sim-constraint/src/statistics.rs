//! Convergence statistics of a solve.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Diagnostics of the current or last `solve` call.
///
/// Updated once per Gauss-Seidel pass and handed to the termination
/// predicate before every pass.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComputationStatistics {
    /// Number of constraint rows being solved.
    pub num_constraints: usize,
    /// Passes performed so far.
    pub num_performed_iterations: usize,
    /// Largest `|Δλ|` of the last pass.
    pub max_change_of_variables: f32,
    /// `|max change of the last pass - max change of the pass before|`.
    pub change_of_max_change_of_variables: f32,
    /// Wall-clock time of the last pass.
    pub iteration_time: Duration,
    /// Wall-clock time since the solve started (assembly included).
    pub total_time: Duration,
    /// Rows skipped in the last pass because their effective mass vanished.
    pub num_skipped_rows: usize,
    /// Whether the hard iteration cap ended the solve.
    pub hit_iteration_limit: bool,
    /// Max change per pass, when convergence tracking is enabled.
    pub convergence_history: Option<Vec<f32>>,
}

impl ComputationStatistics {
    /// Create zeroed statistics for `num_constraints` rows.
    #[must_use]
    pub fn new(num_constraints: usize) -> Self {
        Self {
            num_constraints,
            ..Self::default()
        }
    }

    /// Zero every field and set the constraint count.
    pub fn reset(&mut self, num_constraints: usize) {
        *self = Self::new(num_constraints);
    }

    /// Record a finished pass.
    pub fn record_pass(
        &mut self,
        max_change: f32,
        num_skipped_rows: usize,
        iteration_time: Duration,
        total_time: Duration,
    ) {
        self.num_performed_iterations += 1;
        self.change_of_max_change_of_variables = (max_change - self.max_change_of_variables).abs();
        self.max_change_of_variables = max_change;
        self.num_skipped_rows = num_skipped_rows;
        self.iteration_time = iteration_time;
        self.total_time = total_time;
        if let Some(history) = &mut self.convergence_history {
            history.push(max_change);
        }
    }

    /// Ratio of the last pass's max change to the first pass's, if tracked.
    #[must_use]
    pub fn convergence_ratio(&self) -> Option<f32> {
        let history = self.convergence_history.as_ref()?;
        let first = *history.first()?;
        let last = *history.last()?;
        if first > f32::EPSILON {
            Some(last / first)
        } else {
            Some(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reset_keeps_only_count() {
        let mut stats = ComputationStatistics::new(3);
        stats.record_pass(0.5, 1, Duration::from_micros(3), Duration::from_micros(10));
        stats.hit_iteration_limit = true;

        stats.reset(7);
        assert_eq!(stats, ComputationStatistics::new(7));
        assert_eq!(stats.num_constraints, 7);
        assert_eq!(stats.num_performed_iterations, 0);
        assert!(!stats.hit_iteration_limit);
    }

    #[test]
    fn test_record_pass_tracks_delta() {
        let mut stats = ComputationStatistics::new(2);

        stats.record_pass(0.5, 0, Duration::ZERO, Duration::ZERO);
        assert_eq!(stats.num_performed_iterations, 1);
        assert_relative_eq!(stats.max_change_of_variables, 0.5);
        assert_relative_eq!(stats.change_of_max_change_of_variables, 0.5);

        stats.record_pass(0.125, 0, Duration::ZERO, Duration::from_millis(1));
        assert_eq!(stats.num_performed_iterations, 2);
        assert_relative_eq!(stats.max_change_of_variables, 0.125);
        assert_relative_eq!(stats.change_of_max_change_of_variables, 0.375);
        assert_eq!(stats.total_time, Duration::from_millis(1));
    }

    #[test]
    fn test_convergence_history() {
        let mut stats = ComputationStatistics::new(1);
        assert_eq!(stats.convergence_ratio(), None);

        stats.convergence_history = Some(Vec::new());
        stats.record_pass(1.0, 0, Duration::ZERO, Duration::ZERO);
        stats.record_pass(0.25, 0, Duration::ZERO, Duration::ZERO);

        assert_eq!(stats.convergence_history.as_deref(), Some(&[1.0, 0.25][..]));
        assert_relative_eq!(stats.convergence_ratio().unwrap_or(1.0), 0.25);
    }
}
