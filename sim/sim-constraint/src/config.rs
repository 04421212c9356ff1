//! Solver configuration.

use sim_types::{Result, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the [`MotionConstraintSystem`](crate::MotionConstraintSystem).
///
/// The termination predicate passed to `solve` decides when iteration stops;
/// `max_iterations` is a hard ceiling applied on top of it so that a
/// predicate that never fires cannot loop forever.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionConstraintConfig {
    /// Hard cap on Gauss-Seidel passes per solve.
    pub max_iterations: usize,

    /// Rows whose effective mass `J M⁻¹ Jᵀ` is at or below this value are
    /// skipped (e.g. a row between two static bodies).
    pub effective_mass_epsilon: f32,

    /// Apply the impulse of every row's initial value to the bodies before
    /// the first pass.
    ///
    /// When disabled, initial values only seed the multipliers (and so the
    /// bound functions) and a solve that performs no passes leaves all
    /// velocities untouched.
    pub apply_warm_start: bool,

    /// Record the maximum multiplier change of every pass.
    pub track_convergence: bool,
}

impl Default for MotionConstraintConfig {
    fn default() -> Self {
        Self {
            max_iterations: 256,
            effective_mass_epsilon: 1e-9,
            apply_warm_start: false,
            track_convergence: false,
        }
    }
}

impl MotionConstraintConfig {
    /// Fast configuration for real-time applications.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            max_iterations: 16,
            effective_mass_epsilon: 1e-7,
            apply_warm_start: true,
            track_convergence: false,
        }
    }

    /// High-accuracy configuration for offline or validation runs.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            max_iterations: 4096,
            effective_mass_epsilon: 1e-12,
            apply_warm_start: false,
            track_convergence: true,
        }
    }

    /// Set the hard iteration cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the degenerate-row threshold.
    #[must_use]
    pub const fn with_effective_mass_epsilon(mut self, epsilon: f32) -> Self {
        self.effective_mass_epsilon = epsilon;
        self
    }

    /// Enable applying warm-start impulses before the first pass.
    #[must_use]
    pub const fn with_warm_start(mut self, enabled: bool) -> Self {
        self.apply_warm_start = enabled;
        self
    }

    /// Enable convergence tracking.
    #[must_use]
    pub const fn with_convergence_tracking(mut self, enabled: bool) -> Self {
        self.track_convergence = enabled;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(SimError::invalid_config("max_iterations must be positive"));
        }
        if !self.effective_mass_epsilon.is_finite() || self.effective_mass_epsilon < 0.0 {
            return Err(SimError::invalid_config(
                "effective_mass_epsilon must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MotionConstraintConfig::default();
        assert_eq!(config.max_iterations, 256);
        assert!(!config.apply_warm_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let realtime = MotionConstraintConfig::realtime();
        assert!(realtime.max_iterations <= 32);
        assert!(realtime.apply_warm_start);
        assert!(realtime.validate().is_ok());

        let accurate = MotionConstraintConfig::high_accuracy();
        assert!(accurate.max_iterations >= 1000);
        assert!(accurate.track_convergence);
        assert!(accurate.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = MotionConstraintConfig::default().with_max_iterations(0);
        assert!(config.validate().is_err_and(|e| e.is_config_error()));

        let config = MotionConstraintConfig::default().with_effective_mass_epsilon(-1.0);
        assert!(config.validate().is_err());

        let config = MotionConstraintConfig::default().with_effective_mass_epsilon(f32::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builders() {
        let config = MotionConstraintConfig::default()
            .with_max_iterations(10)
            .with_warm_start(true)
            .with_convergence_tracking(true);

        assert_eq!(config.max_iterations, 10);
        assert!(config.apply_warm_start);
        assert!(config.track_convergence);
    }
}
