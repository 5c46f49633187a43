//! Rigid bodies and the body registry.

use mech_constraint::{BodyFrame, Kinematics, DOF_PER_BODY};
use mech_types::{Arena, BodyHandle, PhysicalState, Pose2, Result, SimError, Vector2};

/// A planar rigid body.
///
/// The body owns its [`PhysicalState`]. Its handle is assigned when it is
/// added to a [`PhysicsWorld`](crate::PhysicsWorld).
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    state: PhysicalState,
    mass: f64,
    rest_pose: Option<Pose2>,
    handle: Option<BodyHandle>,
}

impl RigidBody {
    /// Create a body at rest at `pose`.
    pub fn new(mass: f64, pose: Pose2) -> Result<Self> {
        validate_mass(mass)?;
        Ok(Self {
            state: PhysicalState::at_rest(pose),
            mass,
            rest_pose: None,
            handle: None,
        })
    }

    /// Create a body from a full state.
    pub fn from_state(mass: f64, state: PhysicalState) -> Result<Self> {
        validate_mass(mass)?;
        Ok(Self {
            state,
            mass,
            rest_pose: None,
            handle: None,
        })
    }

    /// Handle assigned by the owning world, if registered.
    #[must_use]
    pub fn handle(&self) -> Option<BodyHandle> {
        self.handle
    }

    pub(crate) fn assign_handle(&mut self, handle: BodyHandle) {
        self.handle = Some(handle);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &PhysicalState {
        &self.state
    }

    /// Mutable state.
    pub fn state_mut(&mut self) -> &mut PhysicalState {
        &mut self.state
    }

    /// Mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub(crate) fn set_mass(&mut self, mass: f64) -> Result<()> {
        validate_mass(mass)?;
        self.mass = mass;
        Ok(())
    }

    /// Rest pose established by the last rest-pose solve.
    #[must_use]
    pub fn rest_pose(&self) -> Option<Pose2> {
        self.rest_pose
    }

    /// Record a new rest pose.
    ///
    /// The first call places the body at `pose`. Later calls shift the live
    /// pose by the difference between the new and old rest poses, so a body
    /// that moved since the last solve keeps its displacement.
    pub fn set_rest_position(&mut self, pose: Pose2) {
        match self.rest_pose {
            None => self.state.set_pose(pose),
            Some(old) => {
                let delta = pose.delta(&old);
                self.state.position += delta.position;
                self.state.angle += delta.angle;
            }
        }
        self.rest_pose = Some(pose);
    }

    /// `½·m·|v|² + ½·m·ω²`.
    ///
    /// The rotational term uses the mass in place of a moment of inertia,
    /// matching the solver's inverse mass.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass
            * (self.state.velocity.norm_squared()
                + self.state.angular_velocity * self.state.angular_velocity)
    }

    /// Set the external force and torque.
    pub fn set_external(&mut self, force: Vector2<f64>, torque: f64) {
        self.state.set_external(force, torque);
    }
}

fn validate_mass(mass: f64) -> Result<()> {
    if mass.is_finite() && mass > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidMass(mass))
    }
}

/// Registry of the bodies in a world.
///
/// Slots are reused after removal; handles carry a generation so a handle
/// to a removed body never resolves to its successor.
#[derive(Debug, Clone, Default)]
pub struct Bodies {
    arena: Arena<RigidBody>,
}

impl Bodies {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether no bodies are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Number of slots, including holes.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.arena.capacity()
    }

    pub(crate) fn insert(&mut self, body: RigidBody) -> BodyHandle {
        let handle = BodyHandle::new(self.arena.insert(body));
        if let Some(body) = self.arena.get_mut(handle.raw()) {
            body.assign_handle(handle);
        }
        handle
    }

    pub(crate) fn remove(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        self.arena.remove(handle.raw()).ok_or_else(|| handle.stale())
    }

    /// Whether `handle` names a live body.
    #[must_use]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.arena.contains(handle.raw())
    }

    /// Body by handle.
    #[must_use]
    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.arena.get(handle.raw())
    }

    /// Mutable body by handle.
    #[must_use]
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.arena.get_mut(handle.raw())
    }

    /// Body by handle, or [`SimError::StaleHandle`].
    pub fn try_get(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.arena.try_get(handle.raw())
    }

    /// Mutable body by handle, or [`SimError::StaleHandle`].
    pub fn try_get_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.arena.try_get_mut(handle.raw())
    }

    /// Set a body's external force and torque.
    pub fn set_external(&mut self, handle: BodyHandle, force: Vector2<f64>, torque: f64) -> Result<()> {
        self.try_get_mut(handle)?.set_external(force, torque);
        Ok(())
    }

    /// Iterate bodies in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.arena.iter().map(|(h, b)| (BodyHandle::new(h), b))
    }

    /// Iterate bodies mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut RigidBody)> {
        self.arena.iter_mut().map(|(h, b)| (BodyHandle::new(h), b))
    }

    /// Sum of kinetic energies.
    #[must_use]
    pub fn total_kinetic_energy(&self) -> f64 {
        self.iter().map(|(_, b)| b.kinetic_energy()).sum()
    }
}

impl BodyFrame for Bodies {
    fn kinematics(&self, body: BodyHandle) -> Result<Kinematics> {
        let state = self.try_get(body)?.state();
        Ok(Kinematics {
            column: body.index() * DOF_PER_BODY,
            position: state.position,
            angle: state.angle,
            velocity: state.velocity,
            angular_velocity: state.angular_velocity,
        })
    }
}
