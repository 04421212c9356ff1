//! Constraint rows.
//!
//! A row couples two bodies through one scalar velocity constraint:
//!
//! ```text
//! J_a · v_a + J_b · v_b  →  bias,      lower(λ) ≤ λ_i ≤ upper(λ)
//! ```
//!
//! `J_a` and `J_b` are the two Jacobian half-rows. Rows are not validated
//! for scale or physical sanity when inserted.

use sim_types::{SpatialVector, Vector3};

use crate::Bound;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of an inserted constraint row (its insertion index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintId(usize);

impl ConstraintId {
    /// Create a constraint ID from an insertion index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl From<usize> for ConstraintId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Constraint({})", self.0)
    }
}

/// One row of the global constraint system, as handed to
/// [`MotionConstraintSystem::insert_constraint`](crate::MotionConstraintSystem::insert_constraint).
///
/// # Example
///
/// ```
/// use sim_constraint::ConstraintRow;
/// use sim_types::SpatialVector;
/// use nalgebra::Vector3;
///
/// // Keep the X velocities of bodies 0 and 1 equal.
/// let row = ConstraintRow::bilateral(
///     0,
///     SpatialVector::linear(Vector3::x()),
///     1,
///     SpatialVector::linear(-Vector3::x()),
/// );
/// assert_eq!(row.rigid_bodies, (0, 1));
/// assert_eq!(row.bias, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct ConstraintRow {
    /// Indices of the two coupled bodies in the caller's body slice.
    pub rigid_bodies: (usize, usize),
    /// Jacobian half-rows for the first and second body.
    pub jacobian: (SpatialVector, SpatialVector),
    /// Target value of `J v` (Baumgarte correction, restitution, motor speed).
    pub bias: f32,
    /// Lower bound of the multiplier.
    pub lower: Bound,
    /// Upper bound of the multiplier.
    pub upper: Bound,
    /// Warm-start seed for the multiplier.
    pub initial_value: f32,
}

impl ConstraintRow {
    /// Create an unbounded row with zero bias.
    #[must_use]
    pub fn new(
        rb_0: usize,
        jacobian_0: SpatialVector,
        rb_1: usize,
        jacobian_1: SpatialVector,
    ) -> Self {
        Self {
            rigid_bodies: (rb_0, rb_1),
            jacobian: (jacobian_0, jacobian_1),
            bias: 0.0,
            lower: Bound::unbounded_lower(),
            upper: Bound::unbounded_upper(),
            initial_value: 0.0,
        }
    }

    /// Create a row from the four Jacobian 3-vectors.
    #[must_use]
    pub fn from_components(
        rb_0: usize,
        linear_0: Vector3<f32>,
        angular_0: Vector3<f32>,
        rb_1: usize,
        linear_1: Vector3<f32>,
        angular_1: Vector3<f32>,
    ) -> Self {
        Self::new(
            rb_0,
            SpatialVector::new(linear_0, angular_0),
            rb_1,
            SpatialVector::new(linear_1, angular_1),
        )
    }

    /// Equality row: the multiplier may take any sign.
    #[must_use]
    pub fn bilateral(
        rb_0: usize,
        jacobian_0: SpatialVector,
        rb_1: usize,
        jacobian_1: SpatialVector,
    ) -> Self {
        Self::new(rb_0, jacobian_0, rb_1, jacobian_1)
    }

    /// Inequality row: the multiplier can only push (`λ ≥ 0`).
    #[must_use]
    pub fn unilateral(
        rb_0: usize,
        jacobian_0: SpatialVector,
        rb_1: usize,
        jacobian_1: SpatialVector,
    ) -> Self {
        Self::new(rb_0, jacobian_0, rb_1, jacobian_1).with_lower(Bound::Constant(0.0))
    }

    /// Set the bias.
    #[must_use]
    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    /// Set both bounds.
    #[must_use]
    pub fn with_bounds(mut self, lower: Bound, upper: Bound) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    /// Set constant bounds.
    #[must_use]
    pub fn with_limits(self, lower: f32, upper: f32) -> Self {
        self.with_bounds(Bound::Constant(lower), Bound::Constant(upper))
    }

    /// Set the lower bound.
    #[must_use]
    pub fn with_lower(mut self, lower: Bound) -> Self {
        self.lower = lower;
        self
    }

    /// Set the upper bound.
    #[must_use]
    pub fn with_upper(mut self, upper: Bound) -> Self {
        self.upper = upper;
        self
    }

    /// Set the warm-start seed.
    ///
    /// Only pair this with a system whose configuration applies warm starts
    /// ([`MotionConstraintConfig::with_warm_start`](crate::MotionConstraintConfig::with_warm_start));
    /// otherwise the seed is never applied to the bodies and the solver only
    /// corrects the difference to it.
    #[must_use]
    pub fn with_initial_value(mut self, initial_value: f32) -> Self {
        self.initial_value = initial_value;
        self
    }
}
