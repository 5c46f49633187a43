//! Lagrange-multiplier constraint solver.
//!
//! Each evaluation assembles `C`, `J` and `J̇` from the registered
//! constraints and solves for the multipliers `λ` in
//!
//! ```text
//! J·W·Jᵗ·λ = −J̇·q̇ − J·W·F_ext − k_s·C − k_d·Ċ,     Ċ = J·q̇
//! ```
//!
//! with `W` the diagonal inverse mass matrix. The Baumgarte terms pull drift
//! back toward the manifold over several steps. The body-space constraint
//! force is `Jᵗ·λ` and the resulting acceleration is `W·(Jᵗ·λ + F_ext)`.
//!
//! # Inverse mass
//!
//! Every body contributes `1/m` on all three of its diagonal entries,
//! including the rotational one. There is no moment of inertia; the angular
//! response uses the linear inverse mass.

use mech_types::{BaumgarteGains, Preconditioner, Result, SimError, SolverConfig};
use nalgebra::DVector;
use tracing::{debug, warn};

use crate::cg::{conjugate_gradient, jacobi_inverse, CgLimits, CgTolerance};
use crate::constraint::Constraint;
use crate::frame::{BodyFrame, RestPoses, DOF_PER_BODY};
use crate::sparse::{ConstraintRows, SparseJacobian};

/// Diagnostics of one dynamic solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Constraint rows in the system.
    pub rows: usize,
    /// CG iterations used.
    pub iterations: usize,
    /// Whether the per-row tolerance was met.
    pub converged: bool,
    /// Norm of the final CG residual.
    pub residual_norm: f64,
    /// Whether the solve started from the previous multipliers.
    pub warm_started: bool,
}

/// Diagnostics of one rest-pose solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestSolution {
    /// Gauss-Newton passes performed.
    pub passes: usize,
    /// Largest `|C|` entry after the last pass.
    pub max_error: f64,
    /// Whether the rest tolerance was met.
    pub converged: bool,
}

/// Sparse conjugate-gradient constraint solver.
///
/// Buffers are sized by [`resize`](Self::resize) whenever the body or
/// constraint topology changes. Between rebuilds only masses may change,
/// through [`update_mass`](Self::update_mass).
#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    config: SolverConfig,
    gains: BaumgarteGains,
    inverse_mass: DVector<f64>,
    rows: ConstraintRows,
    row_count: usize,
    lambda: DVector<f64>,
    lambda_valid: bool,
    constraint_forces: DVector<f64>,
    accelerations: DVector<f64>,
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default(), BaumgarteGains::default())
    }
}

impl ConstraintSolver {
    /// Create an empty solver.
    #[must_use]
    pub fn new(config: SolverConfig, gains: BaumgarteGains) -> Self {
        Self {
            config,
            gains,
            inverse_mass: DVector::zeros(0),
            rows: ConstraintRows::new(0, 0),
            row_count: 0,
            lambda: DVector::zeros(0),
            lambda_valid: false,
            constraint_forces: DVector::zeros(0),
            accelerations: DVector::zeros(0),
        }
    }

    /// Solver configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Stabilization gains.
    #[must_use]
    pub fn gains(&self) -> BaumgarteGains {
        self.gains
    }

    /// Number of body slots covered (columns / 3).
    #[must_use]
    pub fn body_slots(&self) -> usize {
        self.inverse_mass.len() / DOF_PER_BODY
    }

    /// Number of generalized coordinates.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.inverse_mass.len()
    }

    /// Number of constraint rows the solver was sized for.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Reallocate every buffer for a new topology.
    ///
    /// All inverse masses are reset to zero; the caller fills them with
    /// [`update_mass`](Self::update_mass). Warm-start data is discarded.
    pub fn resize(&mut self, body_slots: usize, row_count: usize) {
        let columns = body_slots * DOF_PER_BODY;
        debug!(body_slots, row_count, "resizing constraint solver");
        self.inverse_mass = DVector::zeros(columns);
        self.rows.reset(row_count, columns, true);
        self.row_count = row_count;
        self.lambda = DVector::zeros(row_count);
        self.lambda_valid = false;
        self.constraint_forces = DVector::zeros(columns);
        self.accelerations = DVector::zeros(columns);
    }

    /// Set the inverse mass of one slot. `None` marks an empty slot.
    ///
    /// This is the fast path for a mass change that leaves the topology
    /// alone.
    pub fn update_mass(&mut self, slot: usize, mass: Option<f64>) -> Result<()> {
        let column = slot * DOF_PER_BODY;
        if column + DOF_PER_BODY > self.inverse_mass.len() {
            return Err(SimError::invariant(format!(
                "mass update for slot {slot} outside {} solver slots",
                self.body_slots()
            )));
        }
        let inverse = match mass {
            Some(m) if m.is_finite() && m > 0.0 => 1.0 / m,
            Some(m) => return Err(SimError::InvalidMass(m)),
            None => 0.0,
        };
        self.inverse_mass
            .rows_mut(column, DOF_PER_BODY)
            .fill(inverse);
        Ok(())
    }

    /// Diagonal of `W`.
    #[must_use]
    pub fn inverse_mass(&self) -> &DVector<f64> {
        &self.inverse_mass
    }

    /// Multipliers of the last dynamic solve.
    #[must_use]
    pub fn lambda(&self) -> &DVector<f64> {
        &self.lambda
    }

    /// Body-space constraint forces `Jᵗ·λ` of the last dynamic solve.
    #[must_use]
    pub fn constraint_forces(&self) -> &DVector<f64> {
        &self.constraint_forces
    }

    /// Generalized accelerations of the last dynamic solve.
    #[must_use]
    pub fn accelerations(&self) -> &DVector<f64> {
        &self.accelerations
    }

    fn assemble(
        &mut self,
        constraints: &[&dyn Constraint],
        frame: &dyn BodyFrame,
    ) -> Result<SparseJacobian> {
        let columns = self.columns();
        self.rows.reset(self.row_count, columns, true);
        let mut offset = 0;
        for constraint in constraints {
            let count = constraint.internal_constraint_count();
            if offset + count > self.row_count {
                return Err(self.stale_topology(constraints));
            }
            constraint.calculate(offset, frame, &mut self.rows)?;
            offset += count;
        }
        if offset != self.row_count {
            return Err(self.stale_topology(constraints));
        }
        Ok(self.rows.jacobian())
    }

    fn stale_topology(&self, constraints: &[&dyn Constraint]) -> SimError {
        let rows: usize = constraints
            .iter()
            .map(|c| c.internal_constraint_count())
            .sum();
        SimError::invariant(format!(
            "solver sized for {} rows but constraints contribute {rows}",
            self.row_count
        ))
    }

    fn check_columns(&self, len: usize, what: &str) -> Result<()> {
        if len == self.columns() {
            Ok(())
        } else {
            Err(SimError::invariant(format!(
                "{what} has {len} entries, solver expects {}",
                self.columns()
            )))
        }
    }

    /// Compute constraint forces and accelerations for the current state.
    ///
    /// `velocities` and `external_forces` are generalized vectors with three
    /// entries per body slot. Non-convergence is reported through the
    /// returned [`SolveReport`] and a warning; the last iterate is used.
    pub fn solve_dynamics(
        &mut self,
        constraints: &[&dyn Constraint],
        frame: &dyn BodyFrame,
        velocities: &DVector<f64>,
        external_forces: &DVector<f64>,
    ) -> Result<SolveReport> {
        self.check_columns(velocities.len(), "velocity vector")?;
        self.check_columns(external_forces.len(), "force vector")?;

        if self.row_count == 0 {
            self.constraint_forces.fill(0.0);
            self.accelerations = external_forces.component_mul(&self.inverse_mass);
            return Ok(SolveReport {
                rows: 0,
                iterations: 0,
                converged: true,
                residual_norm: 0.0,
                warm_started: false,
            });
        }

        let jacobian = self.assemble(constraints, frame)?;
        let jacobian_dot = self.rows.jacobian_dot();

        let error_rate = jacobian.mul_vec(velocities);
        let weighted_force = external_forces.component_mul(&self.inverse_mass);
        let rhs = -jacobian_dot.mul_vec(velocities)
            - jacobian.mul_vec(&weighted_force)
            - self.rows.error() * self.gains.stiffness
            - error_rate * self.gains.damping;

        let warm_started = self.config.warm_starting && self.lambda_valid;
        let start = if warm_started {
            self.lambda.clone()
        } else {
            DVector::zeros(self.row_count)
        };

        let preconditioner = match self.config.preconditioner {
            Preconditioner::None => None,
            Preconditioner::Jacobi => {
                Some(jacobi_inverse(&jacobian.normal_diagonal(&self.inverse_mass)))
            }
        };

        let weights = &self.inverse_mass;
        let outcome = conjugate_gradient(
            |p| jacobian.normal_mul(weights, p),
            &rhs,
            start,
            preconditioner.as_ref(),
            CgTolerance {
                relative: self.config.relative_tolerance,
                absolute: self.config.absolute_tolerance,
            },
            CgLimits {
                min_iterations: self.config.min_iterations,
                max_iterations: self.config.max_iterations,
            },
        );

        if !outcome.converged {
            warn!(
                iterations = outcome.iterations,
                residual = outcome.residual_norm,
                rows = self.row_count,
                "constraint solve did not converge"
            );
        }

        self.lambda = outcome.solution;
        self.lambda_valid = self.lambda.iter().all(|v| v.is_finite());
        self.constraint_forces = jacobian.mul_transpose_vec(&self.lambda);
        self.accelerations =
            (&self.constraint_forces + external_forces).component_mul(&self.inverse_mass);

        Ok(SolveReport {
            rows: self.row_count,
            iterations: outcome.iterations,
            converged: outcome.converged,
            residual_norm: outcome.residual_norm,
            warm_started,
        })
    }

    /// Largest `|C|` entry at the state seen through `frame`.
    pub fn max_error(
        &mut self,
        constraints: &[&dyn Constraint],
        frame: &dyn BodyFrame,
    ) -> Result<f64> {
        if self.row_count == 0 {
            return Ok(0.0);
        }
        self.assemble(constraints, frame)?;
        Ok(self.rows.error().amax())
    }

    /// Resolve the static configuration implied by the constraints alone.
    ///
    /// Constraints first snap their bodies where they can. Then Gauss-Newton
    /// passes solve `J·Jᵗ·λ = −C` and move the poses by `Δq = Jᵗ·λ` until the
    /// largest error falls under the rest tolerance or the pass budget runs
    /// out.
    pub fn solve_rest(
        &mut self,
        constraints: &[&dyn Constraint],
        poses: &mut RestPoses,
    ) -> Result<RestSolution> {
        for constraint in constraints {
            constraint.set_body_position(poses)?;
        }

        let columns = self.columns();
        let unit_weights = DVector::from_element(columns, 1.0);
        let tolerance = self.config.rest_tolerance;
        let mut passes = 0;

        let max_error = loop {
            self.rows.reset(self.row_count, columns, false);
            let mut offset = 0;
            for constraint in constraints {
                constraint.rest_matrix(offset, poses, &mut self.rows)?;
                offset += constraint.internal_constraint_count();
            }
            if offset != self.row_count {
                return Err(self.stale_topology(constraints));
            }

            let max_error = if self.row_count == 0 {
                0.0
            } else {
                self.rows.error().amax()
            };
            if max_error <= tolerance || passes >= self.config.rest_passes {
                break max_error;
            }
            if !max_error.is_finite() {
                return Err(SimError::diverged("rest pose error is not finite"));
            }

            let jacobian = self.rows.jacobian();
            let rhs = -self.rows.error();
            let outcome = conjugate_gradient(
                |p| jacobian.normal_mul(&unit_weights, p),
                &rhs,
                DVector::zeros(self.row_count),
                None,
                CgTolerance {
                    relative: 0.0,
                    absolute: tolerance * 1e-2,
                },
                CgLimits {
                    min_iterations: 0,
                    max_iterations: self.config.max_iterations,
                },
            );
            poses.apply_correction(&jacobian.mul_transpose_vec(&outcome.solution));
            passes += 1;
        };

        let converged = max_error <= tolerance;
        if converged {
            debug!(passes, max_error, "rest pose resolved");
        } else {
            warn!(passes, max_error, "rest pose solve did not reach tolerance");
        }
        Ok(RestSolution {
            passes,
            max_error,
            converged,
        })
    }
}
