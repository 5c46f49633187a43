//! Synthesis of constraints between adjacent owners.
//!
//! Each side of an owner may declare a [`ConnectionType`]. When two owners
//! touch, the two facing sides decide which constraint joins them:
//!
//! | Side A | Side B | Result |
//! |---|---|---|
//! | `Linear` | `Linear` | [`WeldConstraint`] |
//! | `LinearBearing` | `LinearBearing` | [`BearingConstraint`] |
//! | `Linear` | `LinearBearing` | [`BearingConstraint`] |
//! | `Rotational` | `Rotational` | [`RotationConstraint`] |
//! | `Xy` | `Xy` | [`BearingConstraint`] |
//! | `None` | any | nothing |
//!
//! Every other pairing is incompatible and produces nothing.

use mech_types::{BodyHandle, ConnectionType, Vector2};

use crate::constraint::Constraint;
use crate::joint::{BearingConstraint, RotationConstraint, WeldConstraint};

/// Constraint family chosen for a pair of connection types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    /// Anchors coincide and relative rotation is locked.
    Weld,
    /// Anchors coincide, rotation free.
    Bearing,
    /// Angles locked, positions free.
    Rotation,
}

/// One side of a connection, resolved to a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment {
    /// Declared connection type.
    pub kind: ConnectionType,
    /// Body the connection acts on.
    pub body: BodyHandle,
    /// Anchor in the body's local frame.
    pub anchor: Vector2<f64>,
    /// Orientation offset of this side (radians).
    pub angle_offset: f64,
}

/// Apply the compatibility rules to a pair of connection types.
#[must_use]
pub fn resolve(a: ConnectionType, b: ConnectionType) -> Option<JointKind> {
    use ConnectionType as T;
    match (a, b) {
        (T::None, _) | (_, T::None) => None,
        (T::Linear, T::Linear) => Some(JointKind::Weld),
        (T::LinearBearing, T::LinearBearing)
        | (T::Linear, T::LinearBearing)
        | (T::LinearBearing, T::Linear)
        | (T::Xy, T::Xy) => Some(JointKind::Bearing),
        (T::Rotational, T::Rotational) => Some(JointKind::Rotation),
        _ => None,
    }
}

/// Build the constraint joining two attachments, if their types connect.
#[must_use]
pub fn synthesize(a: &Attachment, b: &Attachment) -> Option<Box<dyn Constraint>> {
    if a.body == b.body {
        return None;
    }
    let offset = a.angle_offset - b.angle_offset;
    let constraint: Box<dyn Constraint> = match resolve(a.kind, b.kind)? {
        JointKind::Weld => Box::new(
            WeldConstraint::new(a.body, b.body)
                .with_anchors(a.anchor, b.anchor)
                .with_offset(offset),
        ),
        JointKind::Bearing => {
            Box::new(BearingConstraint::new(a.body, b.body).with_anchors(a.anchor, b.anchor))
        }
        JointKind::Rotation => {
            Box::new(RotationConstraint::new(a.body, b.body).with_offset(offset))
        }
    };
    Some(constraint)
}
