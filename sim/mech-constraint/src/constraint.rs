//! The constraint contract.
//!
//! A constraint is a stateless generator of algebraic equations `C(q) = 0`
//! over the generalized coordinates of one or two bodies. Each step it writes
//! its rows of `C`, `J = ∂C/∂q` and `J̇` into the shared [`ConstraintRows`] at
//! the row offset it was assigned when the solver was last rebuilt.
//!
//! ```text
//! C(q) = 0        (position constraint)
//! J · q̇ = 0       (velocity constraint)
//! J · q̈ + J̇ · q̇ = 0  (acceleration constraint)
//! ```

use std::f64::consts::TAU;
use std::fmt;

use mech_types::{BodyHandle, Result};

use crate::frame::{BodyFrame, RestPoses};
use crate::sparse::ConstraintRows;

/// A holonomic constraint over one or two planar bodies.
pub trait Constraint: fmt::Debug + Send {
    /// Number of scalar rows this constraint contributes (1–3).
    fn internal_constraint_count(&self) -> usize;

    /// Bodies referenced by this constraint.
    fn bodies(&self) -> [Option<BodyHandle>; 2];

    /// Fill rows `row .. row + count` of `C`, `J` and `J̇` from the live
    /// state in `frame`.
    fn calculate(&self, row: usize, frame: &dyn BodyFrame, rows: &mut ConstraintRows)
        -> Result<()>;

    /// Fill rows of `C` and `J` from the rest-pose working poses.
    ///
    /// Velocities are zero in the rest solve, so `J̇` is not needed; the
    /// solver resets `rows` with derivative recording off before calling
    /// this.
    fn rest_matrix(&self, row: usize, poses: &RestPoses, rows: &mut ConstraintRows) -> Result<()> {
        self.calculate(row, poses, rows)
    }

    /// Snap referenced bodies directly onto the constraint manifold, when
    /// that is possible without a solve.
    fn set_body_position(&self, _poses: &mut RestPoses) -> Result<()> {
        Ok(())
    }

    /// Whether this constraint references `body`.
    fn references(&self, body: BodyHandle) -> bool {
        self.bodies().contains(&Some(body))
    }
}

/// Write the rows of an anchor coincidence `world(a₁) − world(a₂) = 0`.
///
/// With `r = R(θ)·a` the world offset of a local anchor:
///
/// ```text
/// ∂/∂θ  (x + rₓ, y + r_y) = (−r_y, rₓ)
/// d/dt  (−r_y, rₓ)        = −ω · (rₓ, r_y)
/// ```
pub(crate) fn anchor_rows(
    row: usize,
    first: &crate::Kinematics,
    first_anchor: &mech_types::Vector2<f64>,
    second: &crate::Kinematics,
    second_anchor: &mech_types::Vector2<f64>,
    rows: &mut ConstraintRows,
) {
    let r1 = first.rotated(first_anchor);
    let r2 = second.rotated(second_anchor);
    let error = (first.position + r1) - (second.position + r2);

    rows.set_error(row, error.x);
    rows.set_error(row + 1, error.y);

    rows.add_jacobian(row, first.x_column(), 1.0);
    rows.add_jacobian(row, first.angle_column(), -r1.y);
    rows.add_jacobian(row, second.x_column(), -1.0);
    rows.add_jacobian(row, second.angle_column(), r2.y);

    rows.add_jacobian(row + 1, first.y_column(), 1.0);
    rows.add_jacobian(row + 1, first.angle_column(), r1.x);
    rows.add_jacobian(row + 1, second.y_column(), -1.0);
    rows.add_jacobian(row + 1, second.angle_column(), -r2.x);

    let w1 = first.angular_velocity;
    let w2 = second.angular_velocity;
    rows.add_jacobian_dot(row, first.angle_column(), -w1 * r1.x);
    rows.add_jacobian_dot(row, second.angle_column(), w2 * r2.x);
    rows.add_jacobian_dot(row + 1, first.angle_column(), -w1 * r1.y);
    rows.add_jacobian_dot(row + 1, second.angle_column(), w2 * r2.y);
}

/// Reduce an angle residual to the nearest equivalent in `[−π, π]`.
///
/// Body angles are wrapped independently by the integrator, so two locked
/// bodies can sit a full turn apart while being in step.
#[must_use]
pub(crate) fn wrap_residual(angle: f64) -> f64 {
    angle - TAU * (angle / TAU).round()
}

/// Write the row `θ₁ − θ₂ + offset = 0`, residual taken modulo a full turn.
pub(crate) fn angle_row(
    row: usize,
    first: &crate::Kinematics,
    second: &crate::Kinematics,
    offset: f64,
    rows: &mut ConstraintRows,
) {
    rows.set_error(row, wrap_residual(first.angle - second.angle + offset));
    rows.add_jacobian(row, first.angle_column(), 1.0);
    rows.add_jacobian(row, second.angle_column(), -1.0);
}
