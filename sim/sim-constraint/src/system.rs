//! The motion constraint system.
//!
//! Rows are stored in parallel arrays in insertion order. `solve` first
//! assembles the per-row terms that stay fixed during the solve:
//!
//! ```text
//! (M⁻¹Jᵀ)_a = (m_a⁻¹ J_a.linear, I_a⁻¹ J_a.angular)      (same for b)
//! m_eff     = J_a · (M⁻¹Jᵀ)_a + J_b · (M⁻¹Jᵀ)_b
//! rhs       = bias − J_a · v_a − J_b · v_b               (pre-solve velocities)
//! ```
//!
//! and then runs projected Gauss-Seidel passes. Each pass visits the rows in
//! insertion order:
//!
//! ```text
//! d   = (rhs − J · Δv) / m_eff          Δv = velocity change since assembly
//! λ'  = clamp(λ + d, lower(λ), upper(λ))
//! v  += (λ' − λ) M⁻¹Jᵀ
//! ```
//!
//! Velocity updates are written straight into the caller's bodies, so later
//! rows in a pass see the impulses of earlier rows.

use std::time::Instant;

use sim_types::{Result, RigidBody, SimError, SpatialVector, Vector3};
use tracing::{debug, trace, warn};

use crate::{
    Bound, ComputationStatistics, ConstraintId, ConstraintRow, MotionConstraintConfig,
    TerminationPolicy,
};

/// Iterative solver for velocity constraints between rigid bodies.
///
/// The system is meant to be long-lived: every simulation step the caller
/// calls [`clear`](Self::clear), inserts the active rows and calls
/// [`solve`](Self::solve). Storage capacity is kept across steps.
///
/// # Example
///
/// ```
/// use sim_constraint::{ConstraintRow, DefaultTerminator, MotionConstraintSystem};
/// use sim_types::{Pose, RigidBody, SpatialVector};
/// use nalgebra::{Matrix3, Vector3};
///
/// let mut bodies = vec![
///     RigidBody::from_inverse(Pose::identity(), 1.0, Matrix3::identity())
///         .with_velocity(Vector3::x(), Vector3::zeros()),
///     RigidBody::from_inverse(Pose::identity(), 1.0, Matrix3::identity()),
/// ];
///
/// let mut system = MotionConstraintSystem::default();
/// let id = system.insert_constraint(ConstraintRow::bilateral(
///     0,
///     SpatialVector::linear(Vector3::x()),
///     1,
///     SpatialVector::linear(-Vector3::x()),
/// ));
///
/// system.solve(&mut bodies, DefaultTerminator::default(), 1.0 / 60.0);
///
/// assert!((bodies[0].linear_velocity.x - 0.5).abs() < 1e-5);
/// assert!((bodies[1].linear_velocity.x - 0.5).abs() < 1e-5);
/// assert!((system.solution_of_constraint(id).abs() - 0.5).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MotionConstraintSystem {
    config: MotionConstraintConfig,

    // One entry per row, in insertion order.
    lambda: Vec<f32>,
    bounds: Vec<(Bound, Bound)>,
    index: Vec<(usize, usize)>,
    jacobian: Vec<(SpatialVector, SpatialVector)>,
    bias: Vec<f32>,

    // Rebuilt by `solve`.
    inverted_mass_matrix_times_jacobian_transposed: Vec<(SpatialVector, SpatialVector)>,
    effective_mass: Vec<f32>,
    rhs: Vec<f32>,

    // One entry per body of the last solve.
    velocity_at_start: Vec<SpatialVector>,

    statistics: ComputationStatistics,
}

impl MotionConstraintSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new(config: MotionConstraintConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create an empty system with room for `capacity` rows.
    #[must_use]
    pub fn with_capacity(config: MotionConstraintConfig, capacity: usize) -> Self {
        Self {
            config,
            lambda: Vec::with_capacity(capacity),
            bounds: Vec::with_capacity(capacity),
            index: Vec::with_capacity(capacity),
            jacobian: Vec::with_capacity(capacity),
            bias: Vec::with_capacity(capacity),
            inverted_mass_matrix_times_jacobian_transposed: Vec::with_capacity(capacity),
            effective_mass: Vec::with_capacity(capacity),
            rhs: Vec::with_capacity(capacity),
            velocity_at_start: Vec::new(),
            statistics: ComputationStatistics::default(),
        }
    }

    /// The solver configuration.
    #[must_use]
    pub const fn config(&self) -> &MotionConstraintConfig {
        &self.config
    }

    /// Replace the solver configuration.
    pub fn set_config(&mut self, config: MotionConstraintConfig) {
        self.config = config;
    }

    /// Append a row and return its ID.
    ///
    /// The row is stored as given; body indices are only checked when the
    /// system is solved (or by [`validate`](Self::validate)). The row's
    /// initial value seeds its multiplier.
    ///
    /// The seed's impulse only reaches the bodies when the configuration has
    /// `apply_warm_start` set (see
    /// [`MotionConstraintConfig::with_warm_start`]). Without it the seed
    /// still feeds the bound functions and the first clamp, so a row can end
    /// up applying a net impulse opposite to its seed.
    pub fn insert_constraint(&mut self, row: ConstraintRow) -> ConstraintId {
        let id = ConstraintId::new(self.lambda.len());

        self.lambda.push(row.initial_value);
        self.bounds.push((row.lower, row.upper));
        self.index.push(row.rigid_bodies);
        self.jacobian.push(row.jacobian);
        self.bias.push(row.bias);

        id
    }

    /// Append a row given as its individual parts.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_constraint_parts(
        &mut self,
        rb_0: usize,
        linear_component_0: Vector3<f32>,
        angular_component_0: Vector3<f32>,
        rb_1: usize,
        linear_component_1: Vector3<f32>,
        angular_component_1: Vector3<f32>,
        bias: f32,
        lower: Bound,
        upper: Bound,
        initial_value: f32,
    ) -> ConstraintId {
        self.insert_constraint(
            ConstraintRow::from_components(
                rb_0,
                linear_component_0,
                angular_component_0,
                rb_1,
                linear_component_1,
                angular_component_1,
            )
            .with_bias(bias)
            .with_bounds(lower, upper)
            .with_initial_value(initial_value),
        )
    }

    /// Remove every row and reset the statistics.
    pub fn clear(&mut self) {
        self.lambda.clear();
        self.bounds.clear();
        self.index.clear();
        self.jacobian.clear();
        self.bias.clear();
        self.inverted_mass_matrix_times_jacobian_transposed.clear();
        self.effective_mass.clear();
        self.rhs.clear();
        self.velocity_at_start.clear();
        self.statistics.reset(0);
    }

    /// Number of inserted rows.
    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.lambda.len()
    }

    /// Whether no rows are inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lambda.is_empty()
    }

    /// Body indices coupled by a row.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a row of this system.
    #[must_use]
    pub fn rigid_bodies_of_constraint(&self, id: ConstraintId) -> (usize, usize) {
        self.index[id.raw()]
    }

    /// Current multiplier of a row.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a row of this system.
    #[must_use]
    pub fn solution_of_constraint(&self, id: ConstraintId) -> f32 {
        self.lambda[id.raw()]
    }

    /// Body indices coupled by a row, or an error for an unknown ID.
    pub fn try_rigid_bodies_of_constraint(&self, id: ConstraintId) -> Result<(usize, usize)> {
        self.index
            .get(id.raw())
            .copied()
            .ok_or_else(|| self.invalid_id(id))
    }

    /// Current multiplier of a row, or an error for an unknown ID.
    pub fn try_solution_of_constraint(&self, id: ConstraintId) -> Result<f32> {
        self.lambda
            .get(id.raw())
            .copied()
            .ok_or_else(|| self.invalid_id(id))
    }

    fn invalid_id(&self, id: ConstraintId) -> SimError {
        SimError::InvalidConstraintId {
            id: id.raw(),
            num_constraints: self.num_constraints(),
        }
    }

    /// All multipliers, in insertion order.
    #[must_use]
    pub fn solution(&self) -> &[f32] {
        &self.lambda
    }

    /// Right-hand sides assembled by the last solve.
    #[must_use]
    pub fn right_hand_side(&self) -> &[f32] {
        &self.rhs
    }

    /// Statistics of the last solve.
    #[must_use]
    pub const fn statistics(&self) -> &ComputationStatistics {
        &self.statistics
    }

    /// Check the system against a body slice before solving.
    ///
    /// Reports the first problem found: a bad time step, an invalid
    /// configuration, a row referencing a missing body, a proportional bound
    /// reading a missing row, or bounds that evaluate to `lower > upper` for
    /// the current multipliers.
    pub fn validate(&self, rigid_bodies: &[RigidBody], time_step_in_seconds: f32) -> Result<()> {
        if !time_step_in_seconds.is_finite() || time_step_in_seconds <= 0.0 {
            return Err(SimError::InvalidTimestep(time_step_in_seconds));
        }
        self.config.validate()?;

        let num_bodies = rigid_bodies.len();
        for &(a, b) in &self.index {
            if let Some(index) = [a, b].into_iter().find(|&i| i >= num_bodies) {
                return Err(SimError::InvalidBodyIndex { index, num_bodies });
            }
        }

        let num_constraints = self.num_constraints();
        for (id, (lower, upper)) in self.bounds.iter().enumerate() {
            for source in [lower.source(), upper.source()].into_iter().flatten() {
                if source.raw() >= num_constraints {
                    return Err(SimError::InvalidConstraintId {
                        id: source.raw(),
                        num_constraints,
                    });
                }
            }

            let lower = lower.evaluate(&self.lambda);
            let upper = upper.evaluate(&self.lambda);
            if lower > upper {
                return Err(SimError::InconsistentBounds { id, lower, upper });
            }
        }

        Ok(())
    }

    /// Solve the constraints and update the bodies' velocities in place.
    ///
    /// `terminate` is asked before every pass whether to stop; the
    /// configured `max_iterations` caps the number of passes regardless of
    /// its answer. Afterwards every body referenced by at least one row has
    /// its `acceleration_from_constraints` set to its total velocity change
    /// divided by `time_step_in_seconds`. Other bodies are left untouched.
    ///
    /// Returns the multipliers in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if a row references a body outside `rigid_bodies`, or a
    /// proportional bound reads a row that does not exist.
    pub fn solve<T>(
        &mut self,
        rigid_bodies: &mut [RigidBody],
        mut terminate: T,
        time_step_in_seconds: f32,
    ) -> &[f32]
    where
        T: TerminationPolicy,
    {
        debug_assert!(
            time_step_in_seconds > 0.0,
            "time step must be positive, got {time_step_in_seconds}"
        );

        let start = Instant::now();
        self.statistics.reset(self.num_constraints());
        if self.config.track_convergence {
            self.statistics.convergence_history = Some(Vec::new());
        }

        self.assemble(rigid_bodies);
        if self.config.apply_warm_start {
            self.warm_start(rigid_bodies);
        }

        loop {
            self.statistics.total_time = start.elapsed();
            if terminate.should_terminate(&self.statistics) {
                break;
            }
            if self.statistics.num_performed_iterations >= self.config.max_iterations {
                self.statistics.hit_iteration_limit = true;
                warn!(
                    max_iterations = self.config.max_iterations,
                    max_change = self.statistics.max_change_of_variables,
                    "constraint solve stopped at the iteration limit"
                );
                break;
            }

            let pass_start = Instant::now();
            let (max_change, num_skipped) = self.gauss_seidel_pass(rigid_bodies);
            self.statistics
                .record_pass(max_change, num_skipped, pass_start.elapsed(), start.elapsed());

            trace!(
                iteration = self.statistics.num_performed_iterations,
                max_change,
                num_skipped,
                "gauss-seidel pass"
            );
        }

        self.write_accelerations(rigid_bodies, time_step_in_seconds);
        self.statistics.total_time = start.elapsed();

        debug!(
            num_constraints = self.statistics.num_constraints,
            iterations = self.statistics.num_performed_iterations,
            max_change = self.statistics.max_change_of_variables,
            elapsed = ?self.statistics.total_time,
            "constraint solve finished"
        );

        &self.lambda
    }

    /// Precompute `M⁻¹Jᵀ`, the effective masses and the right-hand sides.
    fn assemble(&mut self, rigid_bodies: &[RigidBody]) {
        self.velocity_at_start.clear();
        self.velocity_at_start
            .extend(rigid_bodies.iter().map(RigidBody::velocity));

        self.inverted_mass_matrix_times_jacobian_transposed.clear();
        self.effective_mass.clear();
        self.rhs.clear();

        for ((&(a, b), (j_a, j_b)), &bias) in self.index.iter().zip(&self.jacobian).zip(&self.bias) {
            let body_a = &rigid_bodies[a];
            let body_b = &rigid_bodies[b];

            let m_a = j_a.apply_inverse_mass(body_a.inverted_mass, &body_a.inverted_inertia_tensor);
            let m_b = j_b.apply_inverse_mass(body_b.inverted_mass, &body_b.inverted_inertia_tensor);

            // Both halves act on one velocity when a row couples a body to itself.
            let effective_mass = if a == b {
                (*j_a + *j_b).dot(&(m_a + m_b))
            } else {
                j_a.dot(&m_a) + j_b.dot(&m_b)
            };

            self.inverted_mass_matrix_times_jacobian_transposed
                .push((m_a, m_b));
            self.effective_mass.push(effective_mass);
            self.rhs
                .push(bias - j_a.dot(&body_a.velocity()) - j_b.dot(&body_b.velocity()));
        }
    }

    /// Apply the impulses of the current multipliers.
    fn warm_start(&self, rigid_bodies: &mut [RigidBody]) {
        for ((&(a, b), (m_a, m_b)), &lambda) in self
            .index
            .iter()
            .zip(&self.inverted_mass_matrix_times_jacobian_transposed)
            .zip(&self.lambda)
        {
            rigid_bodies[a].apply_impulse(lambda, m_a);
            rigid_bodies[b].apply_impulse(lambda, m_b);
        }
    }

    /// One projected Gauss-Seidel sweep over all rows in insertion order.
    ///
    /// Returns the largest `|Δλ|` and the number of degenerate rows skipped.
    fn gauss_seidel_pass(&mut self, rigid_bodies: &mut [RigidBody]) -> (f32, usize) {
        let epsilon = self.config.effective_mass_epsilon;
        let mut max_change = 0.0_f32;
        let mut num_skipped = 0;

        for i in 0..self.lambda.len() {
            let effective_mass = self.effective_mass[i];
            if effective_mass <= epsilon {
                trace!(row = i, effective_mass, "skipping degenerate row");
                num_skipped += 1;
                continue;
            }

            let (a, b) = self.index[i];
            let (j_a, j_b) = &self.jacobian[i];

            let dv_a = rigid_bodies[a].velocity() - self.velocity_at_start[a];
            let dv_b = rigid_bodies[b].velocity() - self.velocity_at_start[b];
            let d = (self.rhs[i] - j_a.dot(&dv_a) - j_b.dot(&dv_b)) / effective_mass;

            let (lower, upper) = &self.bounds[i];
            let lower = lower.evaluate(&self.lambda);
            let upper = upper.evaluate(&self.lambda);
            debug_assert!(
                lower <= upper || lower.is_nan() || upper.is_nan(),
                "row {i}: lower bound {lower} exceeds upper bound {upper}"
            );

            let old = self.lambda[i];
            let new = (old + d).max(lower).min(upper);
            let delta = new - old;

            let (m_a, m_b) = &self.inverted_mass_matrix_times_jacobian_transposed[i];
            rigid_bodies[a].apply_impulse(delta, m_a);
            rigid_bodies[b].apply_impulse(delta, m_b);

            self.lambda[i] = new;
            max_change = max_change.max(delta.abs());
        }

        (max_change, num_skipped)
    }

    fn write_accelerations(&self, rigid_bodies: &mut [RigidBody], time_step_in_seconds: f32) {
        let inv_dt = if time_step_in_seconds > 0.0 {
            time_step_in_seconds.recip()
        } else {
            0.0
        };

        let mut touched = vec![false; rigid_bodies.len()];
        for &(a, b) in &self.index {
            touched[a] = true;
            touched[b] = true;
        }

        for ((body, start), &touched) in rigid_bodies
            .iter_mut()
            .zip(&self.velocity_at_start)
            .zip(&touched)
        {
            if touched {
                body.acceleration_from_constraints = (body.velocity() - *start) * inv_dt;
            }
        }
    }
}
