//! Builders for common constraint rows.
//!
//! These helpers turn contacts, ball-and-socket joints and velocity motors
//! into rows of a [`MotionConstraintSystem`]. They are conveniences on top of
//! [`MotionConstraintSystem::insert_constraint`]; the solver does not depend
//! on them.
//!
//! Jacobian half-rows measure the velocity of body B relative to body A. For
//! a direction `n` and lever arms `r_a`, `r_b` from the body centers to the
//! point of application:
//!
//! ```text
//! J_a = (−n, −(r_a × n))      J_b = (n, r_b × n)
//! ```
//!
//! Joint rows from [`insert_ball_socket`] use the opposite orientation: they
//! constrain the anchor separation `C = p_a − p_b`, so their half-rows are
//! `[e_k, −[r_a]×_k]` for A and `[−e_k, [r_b]×_k]` for B.

use sim_types::{Point3, RigidBody, SpatialVector, Vector3, skew};

use crate::{Bound, ConstraintId, ConstraintRow, MotionConstraintSystem};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A contact point between two bodies, as produced by collision detection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// Index of the first body.
    pub body_a: usize,
    /// Index of the second body.
    pub body_b: usize,
    /// Contact point in world coordinates.
    pub point: Point3<f32>,
    /// Unit contact normal in world coordinates, pointing from A to B.
    pub normal: Vector3<f32>,
    /// Penetration depth (positive when overlapping).
    pub penetration_depth: f32,
    /// Coulomb friction coefficient.
    pub friction: f32,
    /// Coefficient of restitution (0 = inelastic, 1 = elastic).
    pub restitution: f32,
    /// Warm-start impulses for the normal and the two friction rows.
    pub warm_start: [f32; 3],
}

impl ContactPoint {
    /// Create a contact with friction 0.5, no restitution and no warm start.
    #[must_use]
    pub fn new(
        body_a: usize,
        body_b: usize,
        point: Point3<f32>,
        normal: Vector3<f32>,
        penetration_depth: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            point,
            normal,
            penetration_depth,
            friction: 0.5,
            restitution: 0.0,
            warm_start: [0.0; 3],
        }
    }

    /// Set the friction coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    /// Set the coefficient of restitution.
    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    /// Seed the rows with impulses from a previous step.
    ///
    /// The impulses are only used when the system applies warm starts
    /// ([`MotionConstraintConfig::with_warm_start`](crate::MotionConstraintConfig::with_warm_start)).
    /// Otherwise [`insert_contact`] starts the rows from zero.
    #[must_use]
    pub const fn with_warm_start(mut self, impulses: [f32; 3]) -> Self {
        self.warm_start = impulses;
        self
    }
}

/// Stabilization parameters for contact rows.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactSettings {
    /// Fraction of the penetration removed per step (Baumgarte factor).
    pub baumgarte_factor: f32,
    /// Penetration tolerated without correction (slop).
    pub allowed_penetration: f32,
    /// Approach speed below which restitution is ignored.
    pub restitution_threshold: f32,
}

impl Default for ContactSettings {
    fn default() -> Self {
        Self {
            baumgarte_factor: 0.2,
            allowed_penetration: 0.005,
            restitution_threshold: 1.0,
        }
    }
}

/// IDs of the rows inserted for one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactRows {
    /// Non-penetration row (`λ ≥ 0`).
    pub normal: ConstraintId,
    /// Friction row along the first tangent.
    pub tangent_1: ConstraintId,
    /// Friction row along the second tangent.
    pub tangent_2: ConstraintId,
}

/// Two unit vectors orthogonal to `normal` and to each other.
///
/// `normal` does not need to be unit length but must be non-zero.
#[must_use]
pub fn tangent_basis(normal: &Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let normal = normal.normalize();

    let reference = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };

    let t1 = normal.cross(&reference).normalize();
    let t2 = normal.cross(&t1).normalize();
    (t1, t2)
}

/// Jacobian half-rows measuring the relative velocity of B w.r.t. A along
/// `direction` at lever arms `r_a`, `r_b`.
fn relative_velocity_jacobian(
    direction: &Vector3<f32>,
    r_a: &Vector3<f32>,
    r_b: &Vector3<f32>,
) -> (SpatialVector, SpatialVector) {
    (
        SpatialVector::new(-direction, -r_a.cross(direction)),
        SpatialVector::new(*direction, r_b.cross(direction)),
    )
}

/// Insert the three rows of a frictional contact.
///
/// The normal row keeps the bodies from approaching (`λ ≥ 0`). Its bias is
/// the larger of the Baumgarte penetration correction and the restitution
/// target. The friction rows are bounded by `±μ λ_normal` and are inserted
/// after the normal row so that each pass clamps them against the freshly
/// updated normal impulse.
///
/// The contact's warm-start impulses seed the rows only when the system's
/// configuration has `apply_warm_start` set.
///
/// # Panics
///
/// Panics if either body index is outside `rigid_bodies`.
pub fn insert_contact(
    system: &mut MotionConstraintSystem,
    rigid_bodies: &[RigidBody],
    contact: &ContactPoint,
    settings: &ContactSettings,
    time_step_in_seconds: f32,
) -> ContactRows {
    let body_a = &rigid_bodies[contact.body_a];
    let body_b = &rigid_bodies[contact.body_b];
    let r_a = contact.point - body_a.pose.position;
    let r_b = contact.point - body_b.pose.position;

    let (j_a, j_b) = relative_velocity_jacobian(&contact.normal, &r_a, &r_b);

    let penetration_bias = if time_step_in_seconds > 0.0 {
        settings.baumgarte_factor / time_step_in_seconds
            * (contact.penetration_depth - settings.allowed_penetration).max(0.0)
    } else {
        0.0
    };

    // Negative when approaching.
    let normal_velocity = j_a.dot(&body_a.velocity()) + j_b.dot(&body_b.velocity());
    let restitution_bias = if normal_velocity < -settings.restitution_threshold {
        -contact.restitution * normal_velocity
    } else {
        0.0
    };

    let warm_start = if system.config().apply_warm_start {
        contact.warm_start
    } else {
        [0.0; 3]
    };

    let normal = system.insert_constraint(
        ConstraintRow::unilateral(contact.body_a, j_a, contact.body_b, j_b)
            .with_bias(penetration_bias.max(restitution_bias))
            .with_initial_value(warm_start[0]),
    );

    let (t1, t2) = tangent_basis(&contact.normal);
    let mut friction_row = |tangent: &Vector3<f32>, warm_start: f32| {
        let (j_a, j_b) = relative_velocity_jacobian(tangent, &r_a, &r_b);
        system.insert_constraint(
            ConstraintRow::new(contact.body_a, j_a, contact.body_b, j_b)
                .with_bounds(
                    Bound::proportional(normal, -contact.friction),
                    Bound::proportional(normal, contact.friction),
                )
                .with_initial_value(warm_start),
        )
    };

    let tangent_1 = friction_row(&t1, warm_start[1]);
    let tangent_2 = friction_row(&t2, warm_start[2]);

    ContactRows {
        normal,
        tangent_1,
        tangent_2,
    }
}

/// A spherical joint pinning a point of body A to a point of body B.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BallSocket {
    /// Index of the first body.
    pub body_a: usize,
    /// Anchor in body A's local frame.
    pub local_anchor_a: Point3<f32>,
    /// Index of the second body.
    pub body_b: usize,
    /// Anchor in body B's local frame.
    pub local_anchor_b: Point3<f32>,
}

impl BallSocket {
    /// Create a ball-and-socket joint between two local anchors.
    #[must_use]
    pub const fn new(
        body_a: usize,
        local_anchor_a: Point3<f32>,
        body_b: usize,
        local_anchor_b: Point3<f32>,
    ) -> Self {
        Self {
            body_a,
            local_anchor_a,
            body_b,
            local_anchor_b,
        }
    }
}

/// Insert the three bilateral rows of a ball-and-socket joint.
///
/// Row `k` constrains axis `k` of the anchor separation
/// `C = p_a − p_b` with Jacobian `[e_k, −[r_a]×_k, −e_k, [r_b]×_k]` and
/// Baumgarte bias `−β/dt · C_k`.
///
/// # Panics
///
/// Panics if either body index is outside `rigid_bodies`.
pub fn insert_ball_socket(
    system: &mut MotionConstraintSystem,
    rigid_bodies: &[RigidBody],
    joint: &BallSocket,
    baumgarte_factor: f32,
    time_step_in_seconds: f32,
) -> [ConstraintId; 3] {
    let pose_a = &rigid_bodies[joint.body_a].pose;
    let pose_b = &rigid_bodies[joint.body_b].pose;

    let anchor_a = pose_a.transform_point(&joint.local_anchor_a);
    let anchor_b = pose_b.transform_point(&joint.local_anchor_b);
    let r_a = anchor_a - pose_a.position;
    let r_b = anchor_b - pose_b.position;
    let error = anchor_a - anchor_b;

    let stiffness = if time_step_in_seconds > 0.0 {
        baumgarte_factor / time_step_in_seconds
    } else {
        0.0
    };

    let skew_a = skew(&r_a);
    let skew_b = skew(&r_b);

    [0, 1, 2].map(|k| {
        let axis = Vector3::ith(k, 1.0);
        let j_a = SpatialVector::new(axis, -skew_a.row(k).transpose());
        let j_b = SpatialVector::new(-axis, skew_b.row(k).transpose());
        system.insert_constraint(
            ConstraintRow::bilateral(joint.body_a, j_a, joint.body_b, j_b)
                .with_bias(-stiffness * error[k]),
        )
    })
}

/// Insert an angular velocity motor.
///
/// Drives `(ω_b − ω_a) · axis` toward `target_speed` using at most
/// `max_impulse` per step in either direction.
pub fn insert_velocity_motor(
    system: &mut MotionConstraintSystem,
    body_a: usize,
    body_b: usize,
    axis: &Vector3<f32>,
    target_speed: f32,
    max_impulse: f32,
) -> ConstraintId {
    let max_impulse = max_impulse.abs();
    system.insert_constraint(
        ConstraintRow::bilateral(
            body_a,
            SpatialVector::angular(-axis),
            body_b,
            SpatialVector::angular(*axis),
        )
        .with_bias(target_speed)
        .with_limits(-max_impulse, max_impulse),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ComputationStatistics, DefaultTerminator, MotionConstraintConfig,
        default_computation_terminator,
    };
    use approx::assert_relative_eq;
    use sim_types::{Matrix3, Pose};
    use std::time::Duration;

    const DT: f32 = 0.01;

    fn tight(s: &ComputationStatistics) -> bool {
        default_computation_terminator(s, Duration::from_secs(10), 1e-7, 0.0)
    }

    fn ground() -> RigidBody {
        RigidBody::fixed(Pose::identity())
    }

    fn box_at(y: f32, linear_velocity: Vector3<f32>) -> RigidBody {
        RigidBody::from_inverse(
            Pose::from_position(Point3::new(0.0, y, 0.0)),
            1.0,
            Matrix3::identity(),
        )
        .with_velocity(linear_velocity, Vector3::zeros())
    }

    fn floor_contact(penetration_depth: f32) -> ContactPoint {
        ContactPoint::new(0, 1, Point3::origin(), Vector3::y(), penetration_depth)
    }

    #[test]
    fn test_tangent_basis_orthonormal() {
        for normal in [
            Vector3::x(),
            Vector3::y(),
            Vector3::z(),
            Vector3::new(1.0, 2.0, -3.0),
        ] {
            let (t1, t2) = tangent_basis(&normal);
            let n = normal.normalize();
            assert_relative_eq!(t1.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(t2.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(t1.dot(&n), 0.0, epsilon = 1e-6);
            assert_relative_eq!(t2.dot(&n), 0.0, epsilon = 1e-6);
            assert_relative_eq!(t1.dot(&t2), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_contact_stops_fall() {
        let mut bodies = vec![ground(), box_at(0.5, Vector3::new(0.0, -1.0, 0.0))];
        let mut system = MotionConstraintSystem::default();
        let rows = insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.0),
            &ContactSettings::default(),
            DT,
        );

        system.solve(&mut bodies, tight, DT);

        assert_relative_eq!(bodies[1].linear_velocity.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(system.solution_of_constraint(rows.normal), 1.0, epsilon = 1e-5);
        assert_eq!(bodies[0].velocity(), SpatialVector::zero());
    }

    #[test]
    fn test_contact_never_pulls() {
        let mut bodies = vec![ground(), box_at(0.5, Vector3::new(0.0, 2.0, 0.0))];
        let mut system = MotionConstraintSystem::default();
        let rows = insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.0),
            &ContactSettings::default(),
            DT,
        );

        system.solve(&mut bodies, tight, DT);

        assert_relative_eq!(system.solution_of_constraint(rows.normal), 0.0);
        assert_relative_eq!(bodies[1].linear_velocity.y, 2.0);
    }

    #[test]
    fn test_penetration_bias() {
        let mut bodies = vec![ground(), box_at(0.5, Vector3::zeros())];
        let mut system = MotionConstraintSystem::default();
        insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.105),
            &ContactSettings::default(),
            DT,
        );

        system.solve(&mut bodies, tight, DT);

        // 0.2 / 0.01 * (0.105 - 0.005)
        assert_relative_eq!(bodies[1].linear_velocity.y, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_restitution_bias() {
        let mut bodies = vec![ground(), box_at(0.5, Vector3::new(0.0, -3.0, 0.0))];
        let mut system = MotionConstraintSystem::default();
        insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.0).with_restitution(0.5),
            &ContactSettings::default(),
            DT,
        );

        system.solve(&mut bodies, tight, DT);
        assert_relative_eq!(bodies[1].linear_velocity.y, 1.5, epsilon = 1e-4);
    }

    #[test]
    fn test_slow_impact_ignores_restitution() {
        let mut bodies = vec![ground(), box_at(0.5, Vector3::new(0.0, -0.5, 0.0))];
        let mut system = MotionConstraintSystem::default();
        insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.0).with_restitution(1.0),
            &ContactSettings::default(),
            DT,
        );

        system.solve(&mut bodies, tight, DT);
        assert_relative_eq!(bodies[1].linear_velocity.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_friction_limited_by_cone() {
        let mut bodies = vec![ground(), box_at(0.5, Vector3::new(2.0, -1.0, 0.0))];
        let mut system = MotionConstraintSystem::default();
        let rows = insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.0).with_friction(0.5),
            &ContactSettings::default(),
            DT,
        );

        system.solve(&mut bodies, tight, DT);

        let normal = system.solution_of_constraint(rows.normal);
        let t1 = system.solution_of_constraint(rows.tangent_1);
        let t2 = system.solution_of_constraint(rows.tangent_2);

        assert_relative_eq!(normal, 1.0, epsilon = 1e-4);
        assert!(t1.abs() <= 0.5 * normal + 1e-6);
        assert!(t2.abs() <= 0.5 * normal + 1e-6);
        // Sliding: friction saturates and removes μ·λ_n of momentum.
        assert_relative_eq!(bodies[1].linear_velocity.x, 1.5, epsilon = 1e-4);
    }

    #[test]
    fn test_frictionless_contact_keeps_slide() {
        let mut bodies = vec![ground(), box_at(0.5, Vector3::new(2.0, -1.0, 0.0))];
        let mut system = MotionConstraintSystem::default();
        insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.0).with_friction(0.0),
            &ContactSettings::default(),
            DT,
        );

        system.solve(&mut bodies, DefaultTerminator::default(), DT);
        assert_relative_eq!(bodies[1].linear_velocity.x, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_contact_warm_start_seeds() {
        let bodies = vec![ground(), box_at(0.5, Vector3::zeros())];
        let config = MotionConstraintConfig::default().with_warm_start(true);
        let mut system = MotionConstraintSystem::new(config);
        let rows = insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.0).with_warm_start([1.0, 0.1, -0.1]),
            &ContactSettings::default(),
            DT,
        );

        assert_relative_eq!(system.solution_of_constraint(rows.normal), 1.0);
        assert_relative_eq!(system.solution_of_constraint(rows.tangent_1), 0.1);
        assert_relative_eq!(system.solution_of_constraint(rows.tangent_2), -0.1);
    }

    #[test]
    fn test_unapplied_warm_start_ignored() {
        let bodies = vec![ground(), box_at(0.5, Vector3::zeros())];
        let mut system = MotionConstraintSystem::default();
        let rows = insert_contact(
            &mut system,
            &bodies,
            &floor_contact(0.0).with_warm_start([1.0, 0.1, -0.1]),
            &ContactSettings::default(),
            DT,
        );

        assert_relative_eq!(system.solution_of_constraint(rows.normal), 0.0);
        assert_relative_eq!(system.solution_of_constraint(rows.tangent_1), 0.0);
        assert_relative_eq!(system.solution_of_constraint(rows.tangent_2), 0.0);
    }

    #[test]
    fn test_warm_started_contact_releases_separating_body() {
        // Last step's impulse must not drag a body that is now leaving.
        for config in [
            MotionConstraintConfig::default(),
            MotionConstraintConfig::default().with_warm_start(true),
        ] {
            let mut bodies = vec![ground(), box_at(0.5, Vector3::new(0.0, 1.0, 0.0))];
            let mut system = MotionConstraintSystem::new(config);
            let rows = insert_contact(
                &mut system,
                &bodies,
                &floor_contact(0.0)
                    .with_friction(0.0)
                    .with_warm_start([2.0, 0.0, 0.0]),
                &ContactSettings::default(),
                DT,
            );

            system.solve(&mut bodies, DefaultTerminator::default(), DT);

            assert_relative_eq!(bodies[1].linear_velocity.y, 1.0, epsilon = 1e-6);
            assert_relative_eq!(system.solution_of_constraint(rows.normal), 0.0);
        }
    }

    #[test]
    fn test_ball_socket_holds_anchor() {
        let mut bodies = vec![
            ground(),
            RigidBody::from_inverse(
                Pose::from_position(Point3::new(1.0, 0.0, 0.0)),
                1.0,
                Matrix3::identity() * 2.0,
            )
            .with_velocity(Vector3::new(0.0, 1.0, 0.5), Vector3::new(0.3, 0.0, 0.0)),
        ];
        let joint = BallSocket::new(0, Point3::origin(), 1, Point3::new(-1.0, 0.0, 0.0));

        let mut system = MotionConstraintSystem::default();
        let ids = insert_ball_socket(&mut system, &bodies, &joint, 0.2, DT);
        assert_eq!(ids.map(ConstraintId::raw), [0, 1, 2]);

        system.solve(&mut bodies, tight, DT);

        let r_b = Vector3::new(-1.0, 0.0, 0.0);
        let anchor_velocity = bodies[1].linear_velocity + bodies[1].angular_velocity.cross(&r_b);
        assert_relative_eq!(anchor_velocity.norm(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_ball_socket_corrects_drift() {
        // Anchors 0.1 apart along X: the bias drives them back together.
        let mut bodies = vec![ground(), box_at(0.0, Vector3::zeros())];
        let joint = BallSocket::new(0, Point3::new(0.1, 0.0, 0.0), 1, Point3::origin());

        let mut system = MotionConstraintSystem::default();
        insert_ball_socket(&mut system, &bodies, &joint, 0.2, DT);

        system.solve(&mut bodies, tight, DT);

        // C = 0.1, bias = -0.2 / 0.01 * 0.1 = -2 => body B moves +X at 2.
        assert_relative_eq!(bodies[1].linear_velocity.x, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_ball_socket_rows_measure_a_relative_to_b() {
        // B leaves A along +X: J·v = −1, so the X row needs a positive λ.
        let mut bodies = vec![ground(), box_at(0.0, Vector3::x())];
        let joint = BallSocket::new(0, Point3::origin(), 1, Point3::origin());

        let mut system = MotionConstraintSystem::default();
        let [x, _, _] = insert_ball_socket(&mut system, &bodies, &joint, 0.2, DT);

        system.solve(&mut bodies, tight, DT);

        assert_relative_eq!(system.right_hand_side()[x.raw()], 1.0);
        assert_relative_eq!(system.solution_of_constraint(x), 1.0, epsilon = 1e-5);
        assert_relative_eq!(bodies[1].linear_velocity.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_velocity_motor() {
        let spinner = || RigidBody::from_inverse(Pose::identity(), 1.0, Matrix3::identity());
        let mut bodies = vec![spinner(), spinner()];
        let mut system = MotionConstraintSystem::default();
        insert_velocity_motor(&mut system, 0, 1, &Vector3::z(), 1.0, 100.0);

        system.solve(&mut bodies, tight, DT);

        let relative = bodies[1].angular_velocity.z - bodies[0].angular_velocity.z;
        assert_relative_eq!(relative, 1.0, epsilon = 1e-5);
        assert_relative_eq!(bodies[0].angular_velocity.z, -0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_velocity_motor_torque_limit() {
        let spinner = || RigidBody::from_inverse(Pose::identity(), 1.0, Matrix3::identity());
        let mut bodies = vec![spinner(), spinner()];
        let mut system = MotionConstraintSystem::default();
        let id = insert_velocity_motor(&mut system, 0, 1, &Vector3::z(), 1.0, -0.1);

        system.solve(&mut bodies, tight, DT);

        assert_relative_eq!(system.solution_of_constraint(id), 0.1);
        assert_relative_eq!(bodies[1].angular_velocity.z, 0.1, epsilon = 1e-6);
        assert_relative_eq!(bodies[0].angular_velocity.z, -0.1, epsilon = 1e-6);
    }
}
