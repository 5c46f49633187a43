//! Constraint variants and their equations.
//!
//! | Variant | Bodies | Rows | Equation |
//! |---|---|---|---|
//! | [`PositionConstraint`] | 1 | 2 | `x − x₀`, `y − y₀` |
//! | [`LockYConstraint`] | 1 | 2 | `y − y₀`, `θ` |
//! | [`RotationConstraint`] | 2 | 1 | `θ₁ − θ₂ + offset` |
//! | [`BearingConstraint`] | 2 | 2 | `world(a₁) − world(a₂)` |
//! | [`WeldConstraint`] | 2 | 3 | bearing rows, `θ₁ − θ₂ + offset` |
//! | [`PistonConstraint`] | 1 | 2–3 | `y − y₀`, `θ`, travel limit |

use mech_types::{BodyHandle, Pose2, Result, Vector2};

use crate::constraint::{anchor_rows, angle_row, wrap_residual, Constraint};
use crate::frame::{BodyFrame, RestPoses};
use crate::sparse::ConstraintRows;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Position Constraint
// ============================================================================

/// Pins a body's position to a fixed point. Rotation stays free.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionConstraint {
    body: BodyHandle,
    target: Vector2<f64>,
}

impl PositionConstraint {
    /// Pin `body` at `target`.
    #[must_use]
    pub fn new(body: BodyHandle, target: Vector2<f64>) -> Self {
        Self { body, target }
    }

    /// The pinned point.
    #[must_use]
    pub fn target(&self) -> Vector2<f64> {
        self.target
    }

    /// The constrained body.
    #[must_use]
    pub fn body(&self) -> BodyHandle {
        self.body
    }
}

impl Constraint for PositionConstraint {
    fn internal_constraint_count(&self) -> usize {
        2
    }

    fn bodies(&self) -> [Option<BodyHandle>; 2] {
        [Some(self.body), None]
    }

    fn calculate(
        &self,
        row: usize,
        frame: &dyn BodyFrame,
        rows: &mut ConstraintRows,
    ) -> Result<()> {
        let k = frame.kinematics(self.body)?;
        rows.set_error(row, k.position.x - self.target.x);
        rows.set_error(row + 1, k.position.y - self.target.y);
        rows.add_jacobian(row, k.x_column(), 1.0);
        rows.add_jacobian(row + 1, k.y_column(), 1.0);
        Ok(())
    }

    fn set_body_position(&self, poses: &mut RestPoses) -> Result<()> {
        let pose = poses.get(self.body)?;
        poses.set(self.body, Pose2::new(self.target, pose.angle))
    }
}

// ============================================================================
// Lock-Y Constraint
// ============================================================================

/// Pins a body's height and keeps it level. Free to slide along x.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LockYConstraint {
    body: BodyHandle,
    height: f64,
}

impl LockYConstraint {
    /// Lock `body` at height `height` with zero rotation.
    #[must_use]
    pub fn new(body: BodyHandle, height: f64) -> Self {
        Self { body, height }
    }

    /// The locked height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }
}

fn lock_y_rows(
    body: BodyHandle,
    height: f64,
    row: usize,
    frame: &dyn BodyFrame,
    rows: &mut ConstraintRows,
) -> Result<()> {
    let k = frame.kinematics(body)?;
    rows.set_error(row, k.position.y - height);
    rows.set_error(row + 1, wrap_residual(k.angle));
    rows.add_jacobian(row, k.y_column(), 1.0);
    rows.add_jacobian(row + 1, k.angle_column(), 1.0);
    Ok(())
}

fn snap_lock_y(body: BodyHandle, height: f64, poses: &mut RestPoses) -> Result<()> {
    let pose = poses.get(body)?;
    poses.set(body, Pose2::new(Vector2::new(pose.position.x, height), 0.0))
}

impl Constraint for LockYConstraint {
    fn internal_constraint_count(&self) -> usize {
        2
    }

    fn bodies(&self) -> [Option<BodyHandle>; 2] {
        [Some(self.body), None]
    }

    fn calculate(
        &self,
        row: usize,
        frame: &dyn BodyFrame,
        rows: &mut ConstraintRows,
    ) -> Result<()> {
        lock_y_rows(self.body, self.height, row, frame, rows)
    }

    fn set_body_position(&self, poses: &mut RestPoses) -> Result<()> {
        snap_lock_y(self.body, self.height, poses)
    }
}

// ============================================================================
// Piston Constraint
// ============================================================================

/// Travel range of a piston along x.
///
/// The limit row is inactive: it holds a slot in the system with zero error
/// and no Jacobian entries, and applies no force.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TravelLimit {
    /// Lowest allowed x.
    pub min: f64,
    /// Highest allowed x.
    pub max: f64,
}

/// Linear slide: height and rotation locked like [`LockYConstraint`], with an
/// optional travel limit.
///
/// A limit adds a third row to the system. The row is currently emitted with
/// zero error and no Jacobian entries, so it reserves its slot without
/// producing any force.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PistonConstraint {
    body: BodyHandle,
    height: f64,
    limit: Option<TravelLimit>,
}

impl PistonConstraint {
    /// Slide `body` along x at height `height`.
    #[must_use]
    pub fn new(body: BodyHandle, height: f64) -> Self {
        Self {
            body,
            height,
            limit: None,
        }
    }

    /// Set a travel limit.
    #[must_use]
    pub fn with_limit(mut self, min: f64, max: f64) -> Self {
        self.limit = Some(TravelLimit {
            min: min.min(max),
            max: min.max(max),
        });
        self
    }

    /// The travel limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<TravelLimit> {
        self.limit
    }
}

impl Constraint for PistonConstraint {
    fn internal_constraint_count(&self) -> usize {
        if self.limit.is_some() {
            3
        } else {
            2
        }
    }

    fn bodies(&self) -> [Option<BodyHandle>; 2] {
        [Some(self.body), None]
    }

    fn calculate(
        &self,
        row: usize,
        frame: &dyn BodyFrame,
        rows: &mut ConstraintRows,
    ) -> Result<()> {
        lock_y_rows(self.body, self.height, row, frame, rows)?;
        if self.limit.is_some() {
            rows.set_error(row + 2, 0.0);
        }
        Ok(())
    }

    fn set_body_position(&self, poses: &mut RestPoses) -> Result<()> {
        snap_lock_y(self.body, self.height, poses)
    }
}

// ============================================================================
// Rotation Constraint
// ============================================================================

/// Locks the angles of two bodies together (gear or shaft coupling).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotationConstraint {
    first: BodyHandle,
    second: BodyHandle,
    offset: f64,
}

impl RotationConstraint {
    /// Keep `θ(first) = θ(second)`.
    #[must_use]
    pub fn new(first: BodyHandle, second: BodyHandle) -> Self {
        Self {
            first,
            second,
            offset: 0.0,
        }
    }

    /// Keep `θ(first) + offset = θ(second)`.
    #[must_use]
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }
}

impl Constraint for RotationConstraint {
    fn internal_constraint_count(&self) -> usize {
        1
    }

    fn bodies(&self) -> [Option<BodyHandle>; 2] {
        [Some(self.first), Some(self.second)]
    }

    fn calculate(
        &self,
        row: usize,
        frame: &dyn BodyFrame,
        rows: &mut ConstraintRows,
    ) -> Result<()> {
        let first = frame.kinematics(self.first)?;
        let second = frame.kinematics(self.second)?;
        angle_row(row, &first, &second, self.offset, rows);
        Ok(())
    }
}

// ============================================================================
// Bearing Constraint
// ============================================================================

/// Makes two body-local anchors coincide in world space. Relative rotation is
/// free.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BearingConstraint {
    first: BodyHandle,
    second: BodyHandle,
    first_anchor: Vector2<f64>,
    second_anchor: Vector2<f64>,
}

impl BearingConstraint {
    /// Join `first` and `second` at their local origins.
    #[must_use]
    pub fn new(first: BodyHandle, second: BodyHandle) -> Self {
        Self {
            first,
            second,
            first_anchor: Vector2::zeros(),
            second_anchor: Vector2::zeros(),
        }
    }

    /// Set both local anchors.
    #[must_use]
    pub fn with_anchors(mut self, first: Vector2<f64>, second: Vector2<f64>) -> Self {
        self.first_anchor = first;
        self.second_anchor = second;
        self
    }

    /// Local anchors of the first and second body.
    #[must_use]
    pub fn anchors(&self) -> (Vector2<f64>, Vector2<f64>) {
        (self.first_anchor, self.second_anchor)
    }
}

impl Constraint for BearingConstraint {
    fn internal_constraint_count(&self) -> usize {
        2
    }

    fn bodies(&self) -> [Option<BodyHandle>; 2] {
        [Some(self.first), Some(self.second)]
    }

    fn calculate(
        &self,
        row: usize,
        frame: &dyn BodyFrame,
        rows: &mut ConstraintRows,
    ) -> Result<()> {
        let first = frame.kinematics(self.first)?;
        let second = frame.kinematics(self.second)?;
        anchor_rows(
            row,
            &first,
            &self.first_anchor,
            &second,
            &self.second_anchor,
            rows,
        );
        Ok(())
    }
}

// ============================================================================
// Weld Constraint
// ============================================================================

/// A bearing that also locks relative rotation: a rigid joint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeldConstraint {
    bearing: BearingConstraint,
    offset: f64,
}

impl WeldConstraint {
    /// Weld `first` to `second` at their local origins.
    #[must_use]
    pub fn new(first: BodyHandle, second: BodyHandle) -> Self {
        Self {
            bearing: BearingConstraint::new(first, second),
            offset: 0.0,
        }
    }

    /// Set both local anchors.
    #[must_use]
    pub fn with_anchors(mut self, first: Vector2<f64>, second: Vector2<f64>) -> Self {
        self.bearing = self.bearing.with_anchors(first, second);
        self
    }

    /// Set the relative angle offset.
    #[must_use]
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }
}

impl Constraint for WeldConstraint {
    fn internal_constraint_count(&self) -> usize {
        3
    }

    fn bodies(&self) -> [Option<BodyHandle>; 2] {
        self.bearing.bodies()
    }

    fn calculate(
        &self,
        row: usize,
        frame: &dyn BodyFrame,
        rows: &mut ConstraintRows,
    ) -> Result<()> {
        self.bearing.calculate(row, frame, rows)?;
        let first = frame.kinematics(self.bearing.first)?;
        let second = frame.kinematics(self.bearing.second)?;
        angle_row(row + 2, &first, &second, self.offset, rows);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::frame::Kinematics;
    use approx::assert_relative_eq;
    use mech_types::Handle;
    use nalgebra::DVector;

    fn body(index: u32) -> BodyHandle {
        BodyHandle::new(Handle::from_raw_parts(index, 0))
    }

    /// Live frame with velocities, for checking `J̇`.
    struct Moving(Vec<Kinematics>);

    impl BodyFrame for Moving {
        fn kinematics(&self, body: BodyHandle) -> Result<Kinematics> {
            self.0.get(body.index()).copied().ok_or_else(|| body.stale())
        }
    }

    fn moving(slot: usize, x: f64, y: f64, angle: f64, omega: f64) -> Kinematics {
        Kinematics {
            column: slot * 3,
            position: Vector2::new(x, y),
            angle,
            velocity: Vector2::zeros(),
            angular_velocity: omega,
        }
    }

    #[test]
    fn test_position_rows() {
        let c = PositionConstraint::new(body(1), Vector2::new(2.0, -1.0));
        let mut poses = RestPoses::new(2);
        poses.insert(body(0), Pose2::default());
        poses.insert(body(1), Pose2::from_xy(3.0, 1.0));

        let mut rows = ConstraintRows::new(2, 6);
        c.rest_matrix(0, &poses, &mut rows).unwrap();
        assert_relative_eq!(rows.error()[0], 1.0);
        assert_relative_eq!(rows.error()[1], 2.0);

        let j = rows.jacobian().to_dense();
        assert_eq!(j[(0, 3)], 1.0);
        assert_eq!(j[(1, 4)], 1.0);
        assert_eq!(rows.jacobian().nnz(), 2);

        c.set_body_position(&mut poses).unwrap();
        assert_eq!(poses.get(body(1)).unwrap().position, Vector2::new(2.0, -1.0));
    }

    #[test]
    fn test_lock_y_snap_levels_body() {
        let c = LockYConstraint::new(body(0), 4.0);
        let mut poses = RestPoses::new(1);
        poses.insert(body(0), Pose2::new(Vector2::new(7.0, 1.0), 0.3));
        c.set_body_position(&mut poses).unwrap();

        let pose = poses.get(body(0)).unwrap();
        assert_eq!(pose.position, Vector2::new(7.0, 4.0));
        assert_eq!(pose.angle, 0.0);
    }

    #[test]
    fn test_piston_limit_row_is_inactive() {
        let plain = PistonConstraint::new(body(0), 0.0);
        let limited = PistonConstraint::new(body(0), 0.0).with_limit(2.0, -2.0);
        assert_eq!(plain.internal_constraint_count(), 2);
        assert_eq!(limited.internal_constraint_count(), 3);
        assert_eq!(limited.limit().unwrap().min, -2.0);

        let mut poses = RestPoses::new(1);
        poses.insert(body(0), Pose2::new(Vector2::new(5.0, 1.0), 0.1));
        let mut rows = ConstraintRows::new(3, 3);
        limited.rest_matrix(0, &poses, &mut rows).unwrap();

        assert_relative_eq!(rows.error()[0], 1.0);
        assert_relative_eq!(rows.error()[1], 0.1);
        assert_eq!(rows.error()[2], 0.0);
        let j = rows.jacobian().to_dense();
        assert!(j.row(2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rotation_rows() {
        let c = RotationConstraint::new(body(0), body(1)).with_offset(0.5);
        let frame = Moving(vec![moving(0, 0.0, 0.0, 1.0, 0.0), moving(1, 0.0, 0.0, 0.25, 0.0)]);
        let mut rows = ConstraintRows::new(1, 6);
        c.calculate(0, &frame, &mut rows).unwrap();

        assert_relative_eq!(rows.error()[0], 1.25);
        let j = rows.jacobian().to_dense();
        assert_eq!(j[(0, 2)], 1.0);
        assert_eq!(j[(0, 5)], -1.0);
    }

    #[test]
    fn test_bearing_jacobian_matches_finite_difference() {
        let c = BearingConstraint::new(body(0), body(1))
            .with_anchors(Vector2::new(1.0, 0.5), Vector2::new(-0.5, 0.0));
        let base = [0.2, -0.1, 0.7, 1.1, 0.4, -0.3];
        let eval = |q: &[f64; 6]| {
            let frame = Moving(vec![
                moving(0, q[0], q[1], q[2], 0.0),
                moving(1, q[3], q[4], q[5], 0.0),
            ]);
            let mut rows = ConstraintRows::new(2, 6);
            c.calculate(0, &frame, &mut rows).unwrap();
            rows
        };

        let rows = eval(&base);
        let j = rows.jacobian().to_dense();
        let h = 1e-7;
        for col in 0..6 {
            let mut shifted = base;
            shifted[col] += h;
            let diff = (eval(&shifted).error() - rows.error()) / h;
            for r in 0..2 {
                assert_relative_eq!(j[(r, col)], diff[r], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_bearing_jacobian_dot_matches_time_derivative() {
        let c = BearingConstraint::new(body(0), body(1))
            .with_anchors(Vector2::new(1.0, 0.0), Vector2::new(0.0, 2.0));
        let (w1, w2) = (1.5, -0.5);
        let jacobian_at = |t: f64| {
            let frame = Moving(vec![
                moving(0, 0.0, 0.0, 0.3 + w1 * t, w1),
                moving(1, 1.0, 0.0, -0.2 + w2 * t, w2),
            ]);
            let mut rows = ConstraintRows::new(2, 6);
            c.calculate(0, &frame, &mut rows).unwrap();
            rows
        };

        let now = jacobian_at(0.0);
        let h = 1e-7;
        let later = jacobian_at(h).jacobian().to_dense();
        let numeric = (later - now.jacobian().to_dense()) / h;
        let analytic = now.jacobian_dot().to_dense();
        assert_relative_eq!(analytic, numeric, epsilon = 1e-5);
    }

    #[test]
    fn test_weld_adds_angle_row() {
        let c = WeldConstraint::new(body(0), body(1)).with_offset(0.1);
        assert_eq!(c.internal_constraint_count(), 3);
        assert!(c.references(body(1)));
        assert!(!c.references(body(2)));

        let mut poses = RestPoses::new(2);
        poses.insert(body(0), Pose2::new(Vector2::new(1.0, 0.0), 0.4));
        poses.insert(body(1), Pose2::new(Vector2::new(0.0, 0.0), 0.2));
        let mut rows = ConstraintRows::new(3, 6);
        c.rest_matrix(0, &poses, &mut rows).unwrap();

        let expected = DVector::from_vec(vec![1.0, 0.0, 0.3]);
        assert_relative_eq!(*rows.error(), expected, epsilon = 1e-12);
        assert_eq!(rows.jacobian_dot().nnz(), 0);
    }

    #[test]
    fn test_angle_residual_ignores_full_turns() {
        use std::f64::consts::TAU;

        // Second body has wrapped past a full turn, first has not.
        let frame = Moving(vec![
            moving(0, 0.0, 0.0, TAU - 0.1, 10.0),
            moving(1, 1.0, 0.0, 0.35, 10.0),
        ]);

        let lock = RotationConstraint::new(body(0), body(1)).with_offset(0.5);
        let mut rows = ConstraintRows::new(1, 6);
        lock.calculate(0, &frame, &mut rows).unwrap();
        assert_relative_eq!(rows.error()[0], 0.05, epsilon = 1e-12);

        let weld = WeldConstraint::new(body(0), body(1))
            .with_anchors(Vector2::new(0.5, 0.0), Vector2::new(-0.5, 0.0))
            .with_offset(0.5);
        let mut rows = ConstraintRows::new(3, 6);
        weld.calculate(0, &frame, &mut rows).unwrap();
        assert_relative_eq!(rows.error()[2], 0.05, epsilon = 1e-12);

        let level = LockYConstraint::new(body(0), 0.0);
        let mut rows = ConstraintRows::new(2, 6);
        level.calculate(0, &frame, &mut rows).unwrap();
        assert_relative_eq!(rows.error()[1], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_stale_body_propagates() {
        let c = RotationConstraint::new(body(0), body(3));
        let mut poses = RestPoses::new(1);
        poses.insert(body(0), Pose2::default());
        let mut rows = ConstraintRows::new(1, 3);
        assert!(c.rest_matrix(0, &poses, &mut rows).unwrap_err().is_stale_handle());
    }
}
