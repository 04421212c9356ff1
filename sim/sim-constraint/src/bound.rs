//! Bounds on constraint multipliers.
//!
//! Every constraint row clamps its multiplier between a lower and an upper
//! [`Bound`]. A bound is evaluated against the *whole* current solution
//! vector, so one row's admissible range can depend on another row's
//! impulse. The classic case is Coulomb friction:
//!
//! ```text
//! -μ λ_normal ≤ λ_friction ≤ μ λ_normal
//! ```
//!
//! Dependencies are expressed by [`ConstraintId`], i.e. an index into the
//! solution vector, never by a reference into solver storage. The solution
//! vector may reallocate while rows are inserted; an index stays valid.

use std::fmt;
use std::sync::Arc;

use crate::ConstraintId;

/// Shared bound function over the full solution vector.
pub type BoundFn = Arc<dyn Fn(&[f32]) -> f32 + Send + Sync>;

/// A lower or upper bound for one constraint multiplier.
#[derive(Clone)]
pub enum Bound {
    /// A fixed value. Use infinities for unbounded sides.
    Constant(f32),

    /// `factor * λ[source]`, read from the current solution vector.
    Proportional {
        /// Row whose multiplier scales this bound.
        source: ConstraintId,
        /// Scale applied to that multiplier.
        factor: f32,
    },

    /// Arbitrary pure function of the full solution vector.
    Function(BoundFn),
}

impl Bound {
    /// No lower limit.
    #[must_use]
    pub const fn unbounded_lower() -> Self {
        Self::Constant(f32::NEG_INFINITY)
    }

    /// No upper limit.
    #[must_use]
    pub const fn unbounded_upper() -> Self {
        Self::Constant(f32::INFINITY)
    }

    /// Bound proportional to another row's multiplier.
    #[must_use]
    pub const fn proportional(source: ConstraintId, factor: f32) -> Self {
        Self::Proportional { source, factor }
    }

    /// Wrap a closure as a bound.
    #[must_use]
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[f32]) -> f32 + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Evaluate the bound for the given solution vector.
    ///
    /// # Panics
    ///
    /// A [`Bound::Proportional`] whose source is outside `solution` panics.
    #[must_use]
    pub fn evaluate(&self, solution: &[f32]) -> f32 {
        match self {
            Self::Constant(value) => *value,
            Self::Proportional { source, factor } => factor * solution[source.raw()],
            Self::Function(f) => f(solution),
        }
    }

    /// The row this bound reads, if it is a [`Bound::Proportional`].
    #[must_use]
    pub const fn source(&self) -> Option<ConstraintId> {
        match self {
            Self::Proportional { source, .. } => Some(*source),
            Self::Constant(_) | Self::Function(_) => None,
        }
    }
}

impl From<f32> for Bound {
    fn from(value: f32) -> Self {
        Self::Constant(value)
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Proportional { source, factor } => f
                .debug_struct("Proportional")
                .field("source", source)
                .field("factor", factor)
                .finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_ignores_solution() {
        let bound = Bound::Constant(2.5);
        assert_relative_eq!(bound.evaluate(&[]), 2.5);
        assert_relative_eq!(bound.evaluate(&[100.0, -3.0]), 2.5);
    }

    #[test]
    fn test_unbounded_sides() {
        assert!(Bound::unbounded_lower().evaluate(&[]).is_infinite());
        assert!(Bound::unbounded_lower().evaluate(&[]) < 0.0);
        assert!(Bound::unbounded_upper().evaluate(&[]) > 0.0);
    }

    #[test]
    fn test_proportional_reads_source() {
        let upper = Bound::proportional(ConstraintId::new(1), 0.5);
        let lower = Bound::proportional(ConstraintId::new(1), -0.5);
        let solution = [7.0, 4.0, -1.0];

        assert_relative_eq!(upper.evaluate(&solution), 2.0);
        assert_relative_eq!(lower.evaluate(&solution), -2.0);
        assert_eq!(upper.source(), Some(ConstraintId::new(1)));
    }

    #[test]
    fn test_function_bound() {
        let bound = Bound::function(|x: &[f32]| x.iter().sum());
        assert_relative_eq!(bound.evaluate(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(bound.source(), None);
        assert_eq!(format!("{bound:?}"), "Function(..)");
    }

    #[test]
    fn test_from_scalar() {
        let bound: Bound = 0.0_f32.into();
        assert!(matches!(bound, Bound::Constant(v) if v == 0.0));
    }
}
