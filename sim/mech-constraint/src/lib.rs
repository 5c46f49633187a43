//! Holonomic constraints and the constraint solver for planar bodies.
//!
//! Constraints are stateless equation generators over one or two bodies.
//! Each contributes a fixed number of scalar rows to the global system:
//!
//! ```text
//! C(q) = 0               (position level)
//! J·q̇ = 0                (velocity level, J = ∂C/∂q)
//! J·q̈ + J̇·q̇ = 0          (acceleration level)
//! ```
//!
//! The [`ConstraintSolver`] assembles these rows into a sparse Jacobian,
//! solves for Lagrange multipliers with a matrix-free conjugate gradient and
//! applies Baumgarte feedback so drift decays instead of accumulating.
//!
//! # Constraint Types
//!
//! - [`PositionConstraint`]: pin a body to a point
//! - [`LockYConstraint`]: fix height and keep level
//! - [`PistonConstraint`]: horizontal slide with optional travel limit
//! - [`RotationConstraint`]: lock two angles together
//! - [`BearingConstraint`]: pin two anchors together, rotation free
//! - [`WeldConstraint`]: rigid joint
//!
//! # Example
//!
//! ```
//! use mech_constraint::{ConstraintSolver, PositionConstraint, RestPoses};
//! use mech_types::{BodyHandle, Handle, Pose2, Vector2};
//!
//! let body = BodyHandle::new(Handle::from_raw_parts(0, 0));
//! let pin = PositionConstraint::new(body, Vector2::new(1.0, 2.0));
//!
//! let mut solver = ConstraintSolver::default();
//! solver.resize(1, 2);
//! solver.update_mass(0, Some(1.0)).unwrap();
//!
//! let mut poses = RestPoses::new(1);
//! poses.insert(body, Pose2::default());
//! solver.solve_rest(&[&pin], &mut poses).unwrap();
//!
//! assert_eq!(poses.get(body).unwrap().position, Vector2::new(1.0, 2.0));
//! ```

#![doc(html_root_url = "https://docs.rs/mech-constraint/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::missing_errors_doc)]

mod cg;
mod connector;
mod constraint;
mod frame;
mod joint;
mod solver;
mod sparse;

pub use cg::{conjugate_gradient, jacobi_inverse, CgLimits, CgOutcome, CgTolerance};
pub use connector::{resolve, synthesize, Attachment, JointKind};
pub use constraint::Constraint;
pub use frame::{BodyFrame, Kinematics, RestPoses, DOF_PER_BODY};
pub use joint::{
    BearingConstraint, LockYConstraint, PistonConstraint, PositionConstraint, RotationConstraint,
    TravelLimit, WeldConstraint,
};
pub use solver::{ConstraintSolver, RestSolution, SolveReport};
pub use sparse::{ConstraintRows, SparseJacobian};
