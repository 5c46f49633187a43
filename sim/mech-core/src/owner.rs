//! Owners: external entities that contribute bodies, constraints and hooks.
//!
//! An owner declares what it can do in an [`OwnerCapabilities`] value. The
//! world resolves it once at registration and keeps the resulting handles in
//! a [`RegisteredOwner`], so removal can undo everything the owner added.

use std::fmt;

use hashbrown::HashMap;
use mech_constraint::Constraint;
use mech_types::{
    BodyHandle, ConnectionType, ConstraintHandle, Direction, HookHandle, Vector2,
};

use crate::body::RigidBody;
use crate::hooks::{ForceGenerator, StepHandler};

/// Builds something from the handles assigned to an owner's bodies.
pub type Deferred<T> = Box<dyn FnOnce(&[BodyHandle]) -> T + Send>;

/// A mechanical connection point on one side of an owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionPoint {
    /// Coupling kind.
    pub kind: ConnectionType,
    /// Index into the owner's body list.
    pub body: usize,
    /// Anchor in that body's local frame.
    pub anchor: Vector2<f64>,
    /// Orientation offset of this side (radians).
    pub angle_offset: f64,
}

impl ConnectionPoint {
    /// Connection of `kind` at the origin of the owner's body `body`.
    #[must_use]
    pub fn new(kind: ConnectionType, body: usize) -> Self {
        Self {
            kind,
            body,
            anchor: Vector2::zeros(),
            angle_offset: 0.0,
        }
    }

    /// Set the local anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Vector2<f64>) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set the orientation offset.
    #[must_use]
    pub fn with_angle_offset(mut self, angle_offset: f64) -> Self {
        self.angle_offset = angle_offset;
        self
    }
}

/// What an owner contributes to a world.
#[derive(Default)]
pub struct OwnerCapabilities {
    /// Bodies, registered in order.
    pub bodies: Vec<RigidBody>,
    /// Constraints the owner always contributes between its own bodies.
    pub internal_constraints: Option<Deferred<Vec<Box<dyn Constraint>>>>,
    /// Force generator driving the owner's bodies.
    pub force_generator: Option<Deferred<Box<dyn ForceGenerator>>>,
    /// Step handler observing the world.
    pub step_handler: Option<Deferred<Box<dyn StepHandler>>>,
    /// Connection points by side.
    pub connections: HashMap<Direction, ConnectionPoint>,
}

impl fmt::Debug for OwnerCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerCapabilities")
            .field("bodies", &self.bodies.len())
            .field("internal_constraints", &self.internal_constraints.is_some())
            .field("force_generator", &self.force_generator.is_some())
            .field("step_handler", &self.step_handler.is_some())
            .field("connections", &self.connections)
            .finish()
    }
}

impl OwnerCapabilities {
    /// An owner with no capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body.
    #[must_use]
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.bodies.push(body);
        self
    }

    /// Set the internal constraint builder.
    #[must_use]
    pub fn with_internal_constraints<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&[BodyHandle]) -> Vec<Box<dyn Constraint>> + Send + 'static,
    {
        self.internal_constraints = Some(Box::new(build));
        self
    }

    /// Set the force generator builder.
    #[must_use]
    pub fn with_force_generator<F, G>(mut self, build: F) -> Self
    where
        F: FnOnce(&[BodyHandle]) -> G + Send + 'static,
        G: ForceGenerator + 'static,
    {
        self.force_generator = Some(Box::new(move |bodies: &[BodyHandle]| {
            Box::new(build(bodies)) as Box<dyn ForceGenerator>
        }));
        self
    }

    /// Set the step handler builder.
    #[must_use]
    pub fn with_step_handler<F, H>(mut self, build: F) -> Self
    where
        F: FnOnce(&[BodyHandle]) -> H + Send + 'static,
        H: StepHandler + 'static,
    {
        self.step_handler = Some(Box::new(move |bodies: &[BodyHandle]| {
            Box::new(build(bodies)) as Box<dyn StepHandler>
        }));
        self
    }

    /// Declare a connection point on `side`.
    #[must_use]
    pub fn with_connection(mut self, side: Direction, point: ConnectionPoint) -> Self {
        self.connections.insert(side, point);
        self
    }
}

/// Everything a world registered on behalf of one owner.
#[derive(Debug, Clone, Default)]
pub struct RegisteredOwner {
    /// Body handles, in the order the owner declared its bodies.
    pub bodies: Vec<BodyHandle>,
    /// Internal constraints.
    pub constraints: Vec<ConstraintHandle>,
    /// Force generator hook.
    pub force_generator: Option<HookHandle>,
    /// Step handler hook.
    pub step_handler: Option<HookHandle>,
    /// Connection points by side.
    pub connections: HashMap<Direction, ConnectionPoint>,
    /// Constraints joining this owner to its neighbours.
    pub links: Vec<ConstraintHandle>,
}

impl RegisteredOwner {
    /// Resolve the connection on `side` to a body handle.
    ///
    /// Returns `Ok(None)` when the side declares no connection.
    pub fn connection(
        &self,
        side: Direction,
    ) -> mech_types::Result<Option<(ConnectionPoint, BodyHandle)>> {
        let Some(point) = self.connections.get(&side) else {
            return Ok(None);
        };
        let body = self.bodies.get(point.body).copied().ok_or_else(|| {
            mech_types::SimError::invariant(format!(
                "connection on {side:?} names body {} of an owner with {}",
                point.body,
                self.bodies.len()
            ))
        })?;
        Ok(Some((*point, body)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mech_types::Handle;

    #[test]
    fn test_connection_lookup() {
        let body = BodyHandle::new(Handle::from_raw_parts(4, 1));
        let mut owner = RegisteredOwner {
            bodies: vec![body],
            ..Default::default()
        };
        owner
            .connections
            .insert(Direction::East, ConnectionPoint::new(ConnectionType::Linear, 0));
        owner
            .connections
            .insert(Direction::West, ConnectionPoint::new(ConnectionType::Linear, 3));

        let (point, handle) = owner.connection(Direction::East).unwrap().unwrap();
        assert_eq!(handle, body);
        assert_eq!(point.kind, ConnectionType::Linear);
        assert!(owner.connection(Direction::Up).unwrap().is_none());
        assert!(owner.connection(Direction::West).is_err());
    }

    #[test]
    fn test_capabilities_builder() {
        let caps = OwnerCapabilities::new()
            .with_connection(Direction::Up, ConnectionPoint::new(ConnectionType::Rotational, 0))
            .with_internal_constraints(|_| Vec::new());
        assert!(caps.internal_constraints.is_some());
        assert!(caps.force_generator.is_none());
        assert_eq!(caps.connections.len(), 1);
    }
}
