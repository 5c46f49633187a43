//! Planar rigid body state types.
//!
//! Bodies move in the XY plane and rotate about the perpendicular axis, so
//! every body carries three generalized coordinates: `x`, `y` and `θ`.

use nalgebra::Vector2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position and orientation in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose2 {
    /// Position in world coordinates.
    pub position: Vector2<f64>,
    /// Rotation about the plane normal (radians).
    pub angle: f64,
}

impl Pose2 {
    /// Create a pose from position and angle.
    #[must_use]
    pub const fn new(position: Vector2<f64>, angle: f64) -> Self {
        Self { position, angle }
    }

    /// Create a pose at `(x, y)` with zero rotation.
    #[must_use]
    pub fn from_xy(x: f64, y: f64) -> Self {
        Self {
            position: Vector2::new(x, y),
            angle: 0.0,
        }
    }

    /// Transform a body-local point to world coordinates.
    ///
    /// ```
    /// use mech_types::Pose2;
    /// use nalgebra::Vector2;
    ///
    /// let pose = Pose2::new(Vector2::new(1.0, 0.0), std::f64::consts::FRAC_PI_2);
    /// let world = pose.transform_point(&Vector2::new(1.0, 0.0));
    /// assert!((world.x - 1.0).abs() < 1e-12);
    /// assert!((world.y - 1.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn transform_point(&self, local: &Vector2<f64>) -> Vector2<f64> {
        let (sin, cos) = self.angle.sin_cos();
        Vector2::new(
            self.position.x + local.x * cos - local.y * sin,
            self.position.y + local.x * sin + local.y * cos,
        )
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn delta(&self, other: &Self) -> Self {
        Self {
            position: self.position - other.position,
            angle: self.angle - other.angle,
        }
    }

    /// Check if the pose contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|x| x.is_finite()) && self.angle.is_finite()
    }
}

/// Full kinematic and force state of a planar rigid body.
///
/// Accelerations are written by the constraint solver at every integrator
/// stage. The external force accumulator is set by force generators; the
/// constraint force accumulator is written by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhysicalState {
    /// Position in world coordinates.
    pub position: Vector2<f64>,
    /// Orientation (radians).
    pub angle: f64,
    /// Linear velocity.
    pub velocity: Vector2<f64>,
    /// Angular velocity (rad/s).
    pub angular_velocity: f64,
    /// Linear acceleration.
    pub acceleration: Vector2<f64>,
    /// Angular acceleration (rad/s²).
    pub angular_acceleration: f64,
    /// External force accumulator.
    pub force: Vector2<f64>,
    /// External torque accumulator.
    pub torque: f64,
    /// Constraint force from the last solve.
    pub constraint_force: Vector2<f64>,
    /// Constraint torque from the last solve.
    pub constraint_torque: f64,
}

impl PhysicalState {
    /// State at rest at the given pose.
    #[must_use]
    pub fn at_rest(pose: Pose2) -> Self {
        Self {
            position: pose.position,
            angle: pose.angle,
            ..Self::default()
        }
    }

    /// Builder: set the linear velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector2<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: set the angular velocity.
    #[must_use]
    pub fn with_angular_velocity(mut self, angular_velocity: f64) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Current pose.
    #[must_use]
    pub fn pose(&self) -> Pose2 {
        Pose2::new(self.position, self.angle)
    }

    /// Overwrite position and angle.
    pub fn set_pose(&mut self, pose: Pose2) {
        self.position = pose.position;
        self.angle = pose.angle;
    }

    /// Set the external force and torque accumulators.
    pub fn set_external(&mut self, force: Vector2<f64>, torque: f64) {
        self.force = force;
        self.torque = torque;
    }

    /// Check if any kinematic quantity is `NaN` or `Inf`.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose().is_finite()
            && self.velocity.iter().all(|x| x.is_finite())
            && self.angular_velocity.is_finite()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_point_identity() {
        let pose = Pose2::from_xy(2.0, -1.0);
        let world = pose.transform_point(&Vector2::new(0.5, 0.25));
        assert_relative_eq!(world.x, 2.5, epsilon = 1e-12);
        assert_relative_eq!(world.y, -0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_point_rotated() {
        let pose = Pose2::new(Vector2::zeros(), std::f64::consts::PI);
        let world = pose.transform_point(&Vector2::new(1.0, 2.0));
        assert_relative_eq!(world.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(world.y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_state_builders() {
        let state = PhysicalState::at_rest(Pose2::from_xy(1.0, 2.0))
            .with_velocity(Vector2::new(3.0, 0.0))
            .with_angular_velocity(-1.0);

        assert_eq!(state.position.x, 1.0);
        assert_eq!(state.velocity.x, 3.0);
        assert_eq!(state.angular_velocity, -1.0);
        assert!(state.is_finite());
    }

    #[test]
    fn test_non_finite_detected() {
        let mut state = PhysicalState::default();
        state.angle = f64::NAN;
        assert!(!state.is_finite());
    }
}
