//! Six-dimensional spatial vectors.
//!
//! A [`SpatialVector`] pairs a linear and an angular 3-vector. The same type
//! carries three different quantities in the solver:
//!
//! - a generalized velocity `(v, ω)`,
//! - a generalized impulse `(p, L)`,
//! - one body's half-row of a constraint Jacobian `(J_lin, J_ang)`.
//!
//! The dot product of a Jacobian half-row with a velocity gives that body's
//! contribution to the constraint's relative velocity.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A pair of 3-vectors: linear part and angular part.
///
/// # Example
///
/// ```
/// use sim_types::SpatialVector;
/// use nalgebra::Vector3;
///
/// let jacobian = SpatialVector::linear(Vector3::x());
/// let velocity = SpatialVector::new(Vector3::new(2.0, 1.0, 0.0), Vector3::z());
///
/// // Only the X component of the linear velocity is seen by this row.
/// assert_eq!(jacobian.dot(&velocity), 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialVector {
    /// Linear part.
    pub linear: Vector3<f32>,
    /// Angular part.
    pub angular: Vector3<f32>,
}

impl SpatialVector {
    /// Create a spatial vector from its two parts.
    #[must_use]
    pub const fn new(linear: Vector3<f32>, angular: Vector3<f32>) -> Self {
        Self { linear, angular }
    }

    /// The zero vector.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            linear: Vector3::zeros(),
            angular: Vector3::zeros(),
        }
    }

    /// A vector with only a linear part.
    #[must_use]
    pub fn linear(linear: Vector3<f32>) -> Self {
        Self {
            linear,
            angular: Vector3::zeros(),
        }
    }

    /// A vector with only an angular part.
    #[must_use]
    pub fn angular(angular: Vector3<f32>) -> Self {
        Self {
            linear: Vector3::zeros(),
            angular,
        }
    }

    /// Six-dimensional dot product.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        self.linear.dot(&other.linear) + self.angular.dot(&other.angular)
    }

    /// Multiply both parts by a scalar.
    #[must_use]
    pub fn scale(&self, factor: f32) -> Self {
        Self {
            linear: self.linear * factor,
            angular: self.angular * factor,
        }
    }

    /// `self += factor * other`.
    pub fn axpy(&mut self, factor: f32, other: &Self) {
        self.linear.axpy(factor, &other.linear, 1.0);
        self.angular.axpy(factor, &other.angular, 1.0);
    }

    /// Premultiply by a block-diagonal inverse mass matrix.
    ///
    /// The linear part is scaled by `inverted_mass` and the angular part is
    /// transformed by `inverted_inertia`. Applied to a Jacobian half-row this
    /// yields the matching half of `M⁻¹ Jᵀ`.
    #[must_use]
    pub fn apply_inverse_mass(&self, inverted_mass: f32, inverted_inertia: &Matrix3<f32>) -> Self {
        Self {
            linear: self.linear * inverted_mass,
            angular: inverted_inertia * self.angular,
        }
    }

    /// Euclidean norm over all six components.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Check if any component is `NaN` or infinite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|x| x.is_finite()) && self.angular.iter().all(|x| x.is_finite())
    }
}

impl Add for SpatialVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            linear: self.linear + rhs.linear,
            angular: self.angular + rhs.angular,
        }
    }
}

impl Sub for SpatialVector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            linear: self.linear - rhs.linear,
            angular: self.angular - rhs.angular,
        }
    }
}

impl Neg for SpatialVector {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            linear: -self.linear,
            angular: -self.angular,
        }
    }
}

impl Mul<f32> for SpatialVector {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        self.scale(rhs)
    }
}

impl AddAssign for SpatialVector {
    fn add_assign(&mut self, rhs: Self) {
        self.linear += rhs.linear;
        self.angular += rhs.angular;
    }
}

impl SubAssign for SpatialVector {
    fn sub_assign(&mut self, rhs: Self) {
        self.linear -= rhs.linear;
        self.angular -= rhs.angular;
    }
}

/// Rotate a body-space inverse inertia tensor into world space: `R I⁻¹ Rᵀ`.
#[must_use]
pub fn world_inverse_inertia(
    rotation: &UnitQuaternion<f32>,
    body_inverse_inertia: &Matrix3<f32>,
) -> Matrix3<f32> {
    let r = rotation.to_rotation_matrix().into_inner();
    r * body_inverse_inertia * r.transpose()
}

/// Skew-symmetric cross product matrix, `skew(a) * b == a × b`.
#[must_use]
pub fn skew(v: &Vector3<f32>) -> Matrix3<f32> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
