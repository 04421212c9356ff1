//! Error types for constraint simulation.

use thiserror::Error;

/// Errors reported by the fallible checks of the simulation crates.
///
/// The solver's hot path does not return errors: precondition violations
/// there are caller bugs. These variants are produced by the optional
/// validation entry points that callers can run before solving.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A constraint references a body outside the supplied body slice.
    #[error("invalid body index {index} (only {num_bodies} bodies supplied)")]
    InvalidBodyIndex {
        /// The offending index.
        index: usize,
        /// Number of bodies available.
        num_bodies: usize,
    },

    /// A constraint ID outside the current constraint set.
    #[error("invalid constraint ID {id} (only {num_constraints} constraints inserted)")]
    InvalidConstraintId {
        /// The offending ID.
        id: usize,
        /// Number of constraints currently inserted.
        num_constraints: usize,
    },

    /// Bound functions of a constraint disagree.
    #[error("constraint {id} has lower bound {lower} above upper bound {upper}")]
    InconsistentBounds {
        /// The offending constraint.
        id: usize,
        /// Evaluated lower bound.
        lower: f32,
        /// Evaluated upper bound.
        upper: f32,
    },

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f32),

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Invalid mass properties.
    #[error("invalid mass properties: {reason}")]
    InvalidMassProperties {
        /// Description of what's wrong.
        reason: String,
    },
}

impl SimError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid mass properties error.
    #[must_use]
    pub fn invalid_mass(reason: impl Into<String>) -> Self {
        Self::InvalidMassProperties {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if this error points at a bad index or ID.
    #[must_use]
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidBodyIndex { .. } | Self::InvalidConstraintId { .. }
        )
    }
}
