//! Core types for constraint-based rigid body simulation.
//!
//! This crate provides the value types shared by the constraint solver and
//! its callers:
//!
//! - [`SpatialVector`] - Linear + angular pair used for velocities, impulses
//!   and Jacobian half-rows
//! - [`RigidBody`] - Pose, velocity, inverted mass properties and the
//!   solver's acceleration output
//! - [`MassProperties`] - Mass and inertia used to build dynamic bodies
//! - [`SimError`] - Errors from the optional validation entry points
//!
//! All arithmetic is single precision (`f32`). Vectors, matrices and
//! quaternions are the `nalgebra` types, re-exported here.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use sim_types::{RigidBody, Pose, SpatialVector};
//! use nalgebra::{Matrix3, Vector3};
//!
//! let body = RigidBody::from_inverse(Pose::identity(), 1.0, Matrix3::identity())
//!     .with_velocity(Vector3::new(1.0, 0.0, 0.0), Vector3::zeros());
//!
//! let row = SpatialVector::linear(Vector3::x());
//! assert_eq!(row.dot(&body.velocity()), 1.0);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod body;
mod error;
mod spatial;

pub use body::{MassProperties, Pose, RigidBody};
pub use error::SimError;
pub use spatial::{SpatialVector, skew, world_inverse_inertia};

// Re-export math types for convenience
pub use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, UnitQuaternion, Vector3};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
