//! Rigid body records.
//!
//! A [`RigidBody`] is the per-body state the constraint solver reads and
//! writes: pose, velocity, inverted mass properties, and the acceleration
//! produced by the last constraint solve. Bodies live in a caller-owned slice
//! and are referred to by their index in that slice.

use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, UnitQuaternion, Vector3};

use crate::spatial::{SpatialVector, world_inverse_inertia};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position and orientation of a rigid body.
///
/// # Example
///
/// ```
/// use sim_types::Pose;
/// use nalgebra::Point3;
///
/// let pose = Pose::from_position(Point3::new(1.0, 2.0, 3.0));
/// let world = pose.transform_point(&Point3::new(1.0, 0.0, 0.0));
/// assert_eq!(world, Point3::new(2.0, 2.0, 3.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in world coordinates.
    pub position: Point3<f32>,
    /// Orientation as a unit quaternion.
    pub rotation: UnitQuaternion<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Create an identity pose (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Create a pose from position only (identity rotation).
    #[must_use]
    pub fn from_position(position: Point3<f32>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Create a pose from position and rotation.
    #[must_use]
    pub const fn from_position_rotation(
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
    ) -> Self {
        Self { position, rotation }
    }

    /// Convert to an isometry.
    #[must_use]
    pub fn to_isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(self.position.coords.into(), self.rotation)
    }

    /// Homogeneous 4×4 transform matrix.
    #[must_use]
    pub fn to_homogeneous(&self) -> Matrix4<f32> {
        self.to_isometry().to_homogeneous()
    }

    /// Transform a point from local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f32>) -> Point3<f32> {
        self.position + self.rotation * local.coords
    }

    /// Transform a vector from local to world coordinates (rotation only).
    #[must_use]
    pub fn transform_vector(&self, local: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * local
    }

    /// Check if the pose contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite())
            && self.rotation.coords.iter().all(|x| x.is_finite())
    }
}

/// Mass properties of a rigid body.
///
/// Contains mass, center of mass offset, and inertia tensor in body space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass in kg.
    pub mass: f32,
    /// Center of mass offset from body origin in local coordinates.
    pub center_of_mass: Vector3<f32>,
    /// Inertia tensor about center of mass in local coordinates (kg·m²).
    pub inertia: Matrix3<f32>,
}

impl MassProperties {
    /// Create mass properties with given values.
    #[must_use]
    pub const fn new(mass: f32, center_of_mass: Vector3<f32>, inertia: Matrix3<f32>) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia,
        }
    }

    /// Create mass properties for a point mass at the origin.
    ///
    /// A point mass has no rotational inertia; bodies built from it cannot
    /// be rotated by constraint impulses.
    #[must_use]
    pub fn point_mass(mass: f32) -> Self {
        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// Create mass properties for a uniform sphere.
    ///
    /// Inertia of a solid sphere: I = (2/5) * m * r²
    #[must_use]
    pub fn sphere(mass: f32, radius: f32) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::from_diagonal_element(i),
        }
    }

    /// Create mass properties for a uniform box.
    ///
    /// - Ixx = (1/12) * m * (y² + z²)
    /// - Iyy = (1/12) * m * (x² + z²)
    /// - Izz = (1/12) * m * (x² + y²)
    #[must_use]
    pub fn box_shape(mass: f32, half_extents: Vector3<f32>) -> Self {
        let x2 = 4.0 * half_extents.x * half_extents.x;
        let y2 = 4.0 * half_extents.y * half_extents.y;
        let z2 = 4.0 * half_extents.z * half_extents.z;

        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::from_diagonal(&Vector3::new(
                mass * (y2 + z2) / 12.0,
                mass * (x2 + z2) / 12.0,
                mass * (x2 + y2) / 12.0,
            )),
        }
    }

    /// Get the inverse mass (0 if mass is infinite/static).
    #[must_use]
    pub fn inverse_mass(&self) -> f32 {
        if self.is_static() { 0.0 } else { 1.0 / self.mass }
    }

    /// Get the body-space inverse inertia tensor.
    ///
    /// Returns `None` if the inertia is singular.
    #[must_use]
    pub fn inverse_inertia(&self) -> Option<Matrix3<f32>> {
        self.inertia.try_inverse()
    }

    /// Check if this represents a static (immovable) body.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0 || self.mass.is_infinite()
    }

    /// Validate that the mass properties are physically valid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.mass < 0.0 || self.mass.is_nan() {
            return Err(crate::SimError::invalid_mass("mass cannot be negative"));
        }

        if !self.center_of_mass.iter().all(|x| x.is_finite()) {
            return Err(crate::SimError::invalid_mass(
                "center of mass must be finite",
            ));
        }

        let eigenvalues = self.inertia.symmetric_eigenvalues();
        if eigenvalues.iter().any(|&e| e < -1e-6) {
            return Err(crate::SimError::invalid_mass(
                "inertia tensor must be positive semi-definite",
            ));
        }

        Ok(())
    }
}

/// Solver-facing state of a rigid body.
///
/// The inverted inertia tensor is stored in world space and is fixed at
/// construction. Inverted mass and inverted inertia are both zero for static
/// or kinematic bodies.
///
/// # Example
///
/// ```
/// use sim_types::{MassProperties, Pose, RigidBody};
/// use nalgebra::{Point3, Vector3};
///
/// let mut body = RigidBody::dynamic(Pose::identity(), &MassProperties::sphere(2.0, 0.5));
/// body.linear_velocity = Vector3::new(1.0, 0.0, 0.0);
///
/// assert_eq!(body.inverted_mass, 0.5);
/// assert!(!body.is_static());
///
/// let ground = RigidBody::fixed(Pose::from_position(Point3::origin()));
/// assert!(ground.is_static());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBody {
    /// Position and orientation.
    pub pose: Pose,
    /// Linear velocity in world coordinates.
    pub linear_velocity: Vector3<f32>,
    /// Angular velocity in world coordinates.
    pub angular_velocity: Vector3<f32>,
    /// Inverse mass (0 for static bodies).
    pub inverted_mass: f32,
    /// Inverse inertia tensor in world frame.
    pub inverted_inertia_tensor: Matrix3<f32>,
    /// Generalized acceleration applied by the last constraint solve.
    pub acceleration_from_constraints: SpatialVector,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::fixed(Pose::identity())
    }
}

impl RigidBody {
    /// Create a static body with infinite mass.
    #[must_use]
    pub fn fixed(pose: Pose) -> Self {
        Self::from_inverse(pose, 0.0, Matrix3::zeros())
    }

    /// Create a dynamic body from its mass properties.
    ///
    /// The body-space inertia is inverted and rotated into world space using
    /// the pose's orientation. A singular inertia tensor locks rotation.
    #[must_use]
    pub fn dynamic(pose: Pose, mass: &MassProperties) -> Self {
        if mass.is_static() {
            return Self::fixed(pose);
        }
        let inverted_inertia = mass
            .inverse_inertia()
            .map_or_else(Matrix3::zeros, |inv| world_inverse_inertia(&pose.rotation, &inv));
        Self::from_inverse(pose, mass.inverse_mass(), inverted_inertia)
    }

    /// Create a body from already inverted mass properties (world space).
    #[must_use]
    pub fn from_inverse(
        pose: Pose,
        inverted_mass: f32,
        inverted_inertia_tensor: Matrix3<f32>,
    ) -> Self {
        Self {
            pose,
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            inverted_mass,
            inverted_inertia_tensor,
            acceleration_from_constraints: SpatialVector::zero(),
        }
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, linear: Vector3<f32>, angular: Vector3<f32>) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    /// Generalized velocity `(v, ω)`.
    #[must_use]
    pub fn velocity(&self) -> SpatialVector {
        SpatialVector::new(self.linear_velocity, self.angular_velocity)
    }

    /// Overwrite the generalized velocity.
    pub fn set_velocity(&mut self, velocity: SpatialVector) {
        self.linear_velocity = velocity.linear;
        self.angular_velocity = velocity.angular;
    }

    /// Add `magnitude * m_inv_j` to the velocity, where `m_inv_j` is this
    /// body's half of a precomputed `M⁻¹ Jᵀ` row.
    pub fn apply_impulse(&mut self, magnitude: f32, m_inv_j: &SpatialVector) {
        self.linear_velocity.axpy(magnitude, &m_inv_j.linear, 1.0);
        self.angular_velocity.axpy(magnitude, &m_inv_j.angular, 1.0);
    }

    /// Whether the body is immovable (zero inverted mass and inertia).
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.inverted_mass == 0.0 && self.inverted_inertia_tensor == Matrix3::zeros()
    }

    /// Check if the state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.velocity().is_finite()
    }
}
