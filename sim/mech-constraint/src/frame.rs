//! Views of body kinematics consumed by constraints.
//!
//! Constraints never own bodies. They look bodies up through a
//! [`BodyFrame`], which is either the live world state (dynamic solve) or the
//! working poses of the rest-pose solve ([`RestPoses`], zero velocity).

use mech_types::{BodyHandle, Pose2, Result, Vector2};
use nalgebra::DVector;

/// Degrees of freedom per planar body: `x`, `y`, `θ`.
pub const DOF_PER_BODY: usize = 3;

/// Kinematic snapshot of one body as seen by a constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    /// First column of this body's block in the Jacobian (`3 · slot`).
    pub column: usize,
    /// Position in world coordinates.
    pub position: Vector2<f64>,
    /// Orientation (radians).
    pub angle: f64,
    /// Linear velocity.
    pub velocity: Vector2<f64>,
    /// Angular velocity.
    pub angular_velocity: f64,
}

impl Kinematics {
    /// Kinematics at the given slot and pose with zero velocity.
    #[must_use]
    pub fn at_rest(slot: usize, pose: Pose2) -> Self {
        Self {
            column: slot * DOF_PER_BODY,
            position: pose.position,
            angle: pose.angle,
            velocity: Vector2::zeros(),
            angular_velocity: 0.0,
        }
    }

    /// Column of the x coordinate.
    #[must_use]
    pub const fn x_column(&self) -> usize {
        self.column
    }

    /// Column of the y coordinate.
    #[must_use]
    pub const fn y_column(&self) -> usize {
        self.column + 1
    }

    /// Column of the angle.
    #[must_use]
    pub const fn angle_column(&self) -> usize {
        self.column + 2
    }

    /// Body-local anchor rotated into world orientation (no translation).
    #[must_use]
    pub fn rotated(&self, local: &Vector2<f64>) -> Vector2<f64> {
        let (sin, cos) = self.angle.sin_cos();
        Vector2::new(local.x * cos - local.y * sin, local.x * sin + local.y * cos)
    }

    /// World position of a body-local anchor.
    #[must_use]
    pub fn anchor_world(&self, local: &Vector2<f64>) -> Vector2<f64> {
        self.position + self.rotated(local)
    }
}

/// Read access to body kinematics by handle.
pub trait BodyFrame {
    /// Kinematics of `body`, or [`mech_types::SimError::StaleHandle`].
    fn kinematics(&self, body: BodyHandle) -> Result<Kinematics>;
}

/// Working poses of the rest-pose solve, indexed by body slot.
#[derive(Debug, Clone, Default)]
pub struct RestPoses {
    slots: Vec<Option<(BodyHandle, Pose2)>>,
}

impl RestPoses {
    /// Empty pose table covering `slot_count` slots.
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![None; slot_count],
        }
    }

    /// Number of slots covered.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Seed the pose of a body, growing the table if needed.
    pub fn insert(&mut self, body: BodyHandle, pose: Pose2) {
        let slot = body.index();
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, None);
        }
        self.slots[slot] = Some((body, pose));
    }

    /// Current working pose of `body`.
    pub fn get(&self, body: BodyHandle) -> Result<Pose2> {
        match self.slots.get(body.index()) {
            Some(Some((handle, pose))) if *handle == body => Ok(*pose),
            _ => Err(body.stale()),
        }
    }

    /// Overwrite the working pose of `body`.
    pub fn set(&mut self, body: BodyHandle, pose: Pose2) -> Result<()> {
        match self.slots.get_mut(body.index()) {
            Some(Some((handle, slot_pose))) if *handle == body => {
                *slot_pose = pose;
                Ok(())
            }
            _ => Err(body.stale()),
        }
    }

    /// Add a generalized-coordinate correction (`3` entries per slot).
    pub fn apply_correction(&mut self, delta: &DVector<f64>) {
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            let Some((_, pose)) = entry else {
                continue;
            };
            let column = slot * DOF_PER_BODY;
            if column + 2 >= delta.len() {
                break;
            }
            pose.position.x += delta[column];
            pose.position.y += delta[column + 1];
            pose.angle += delta[column + 2];
        }
    }

    /// Iterate seeded bodies and their poses.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, Pose2)> + '_ {
        self.slots.iter().filter_map(|entry| *entry)
    }
}

impl BodyFrame for RestPoses {
    fn kinematics(&self, body: BodyHandle) -> Result<Kinematics> {
        let pose = self.get(body)?;
        Ok(Kinematics::at_rest(body.index(), pose))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mech_types::Handle;

    fn body(index: u32, generation: u32) -> BodyHandle {
        BodyHandle::new(Handle::from_raw_parts(index, generation))
    }

    #[test]
    fn test_anchor_world() {
        let k = Kinematics {
            column: 0,
            position: Vector2::new(1.0, 1.0),
            angle: std::f64::consts::FRAC_PI_2,
            velocity: Vector2::zeros(),
            angular_velocity: 0.0,
        };
        let world = k.anchor_world(&Vector2::new(2.0, 0.0));
        assert_relative_eq!(world.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(world.y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rest_poses_generation_check() {
        let mut poses = RestPoses::new(2);
        poses.insert(body(1, 3), Pose2::from_xy(4.0, 5.0));

        assert_eq!(poses.get(body(1, 3)).unwrap().position.x, 4.0);
        assert!(poses.get(body(1, 2)).unwrap_err().is_stale_handle());
        assert!(poses.get(body(0, 0)).is_err());

        let k = poses.kinematics(body(1, 3)).unwrap();
        assert_eq!(k.column, 3);
        assert_eq!(k.angular_velocity, 0.0);
    }

    #[test]
    fn test_apply_correction() {
        let mut poses = RestPoses::new(0);
        poses.insert(body(1, 0), Pose2::from_xy(1.0, 1.0));
        let delta = DVector::from_vec(vec![9.0, 9.0, 9.0, 0.5, -0.5, 0.25]);
        poses.apply_correction(&delta);

        let pose = poses.get(body(1, 0)).unwrap();
        assert_relative_eq!(pose.position.x, 1.5);
        assert_relative_eq!(pose.position.y, 0.5);
        assert_relative_eq!(pose.angle, 0.25);
        assert_eq!(poses.iter().count(), 1);
    }
}
