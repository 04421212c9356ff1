//! Iterative velocity-constraint solver for rigid bodies.
//!
//! This crate implements a Sequential Impulses solver: constraint rows
//! coupling pairs of rigid bodies are resolved one at a time by projected
//! Gauss-Seidel, producing one bounded Lagrange multiplier (impulse
//! magnitude) per row and updating the bodies' velocities in place.
//!
//! # Building Blocks
//!
//! - [`MotionConstraintSystem`]: owns the rows and runs the solve
//! - [`ConstraintRow`]: two body indices, two Jacobian half-rows, a bias,
//!   bounds and a warm-start seed
//! - [`Bound`]: constant, proportional to another row's multiplier (friction
//!   cones), or an arbitrary function of the full solution vector
//! - [`TerminationPolicy`]: decides when iteration stops; see
//!   [`DefaultTerminator`] and [`default_computation_terminator`]
//! - [`ComputationStatistics`]: per-solve convergence diagnostics
//! - [`rows`]: builders for contacts, ball-and-socket joints and motors
//!
//! # Per-Step Usage
//!
//! ```text
//! system.clear()
//! system.insert_constraint(row)    // once per active coupling
//! system.solve(&mut bodies, terminator, dt)
//! ```
//!
//! Rows are visited in insertion order on every pass, so identical inputs
//! give bit-identical results. `max_iterations` in
//! [`MotionConstraintConfig`] caps the number of passes even when the
//! termination policy never fires.
//!
//! # Example
//!
//! ```
//! use sim_constraint::{
//!     ContactPoint, ContactSettings, DefaultTerminator, MotionConstraintSystem,
//!     rows::insert_contact,
//! };
//! use sim_types::{MassProperties, Pose, RigidBody};
//! use nalgebra::{Point3, Vector3};
//!
//! // A ball falling onto the ground.
//! let mut bodies = vec![
//!     RigidBody::fixed(Pose::identity()),
//!     RigidBody::dynamic(
//!         Pose::from_position(Point3::new(0.0, 0.0, 0.5)),
//!         &MassProperties::sphere(1.0, 0.5),
//!     )
//!     .with_velocity(Vector3::new(0.0, 0.0, -2.0), Vector3::zeros()),
//! ];
//!
//! let dt = 1.0 / 60.0;
//! let mut system = MotionConstraintSystem::default();
//! let contact = ContactPoint::new(0, 1, Point3::origin(), Vector3::z(), 0.0);
//! let rows = insert_contact(&mut system, &bodies, &contact, &ContactSettings::default(), dt);
//!
//! system.solve(&mut bodies, DefaultTerminator::default(), dt);
//!
//! assert!(bodies[1].linear_velocity.z > -1e-4);
//! assert!(system.solution_of_constraint(rows.normal) > 0.0);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-constraint/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod bound;
mod config;
mod row;
pub mod rows;
mod statistics;
mod system;
mod termination;

pub use bound::{Bound, BoundFn};
pub use config::MotionConstraintConfig;
pub use row::{ConstraintId, ConstraintRow};
pub use rows::{BallSocket, ContactPoint, ContactRows, ContactSettings};
pub use statistics::ComputationStatistics;
pub use system::MotionConstraintSystem;
pub use termination::{DefaultTerminator, TerminationPolicy, default_computation_terminator};

// Re-export types needed to build rows
pub use sim_types::{RigidBody, SpatialVector, Vector3};
