//! Planar rigid-body world with constraint dynamics.
//!
//! This crate provides:
//!
//! - [`RigidBody`] and the [`Bodies`] registry
//! - [`PhysicsWorld`]: bodies, constraints, hooks and owners in one context
//! - [`Rk4Integrator`]: the four-stage scheme with a constraint solve per stage
//! - [`ForceGenerator`] / [`StepHandler`] hooks and the [`EnergyMeter`]
//! - [`OwnerCapabilities`]: registration of external owners and their
//!   connections
//!
//! # Example
//!
//! ```
//! use mech_constraint::{PositionConstraint, RotationConstraint};
//! use mech_core::{PhysicsWorld, RigidBody};
//! use mech_types::{PhysicsConfig, Pose2, Vector2};
//!
//! let mut world = PhysicsWorld::new(PhysicsConfig::fast()).unwrap();
//! let wheel = world.add_body(RigidBody::new(1.0, Pose2::default()).unwrap());
//! let shaft = world.add_body(RigidBody::new(1.0, Pose2::from_xy(1.0, 0.0)).unwrap());
//!
//! world.add_constraint(Box::new(PositionConstraint::new(wheel, Vector2::zeros()))).unwrap();
//! world.add_constraint(Box::new(RotationConstraint::new(wheel, shaft))).unwrap();
//! world.body_mut(shaft).unwrap().state_mut().angular_velocity = 1.0;
//!
//! world.tick(1.0 / 20.0).unwrap();
//! assert!(world.body(wheel).unwrap().state().position.norm() < 1e-3);
//! ```

#![doc(html_root_url = "https://docs.rs/mech-core/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::missing_errors_doc)]

mod body;
mod hooks;
mod integrator;
mod owner;
mod world;

pub use body::{Bodies, RigidBody};
pub use hooks::{EnergyMeter, EnergyReading, ForceGenerator, StepHandler};
pub use integrator::{Rk4Integrator, STAGES};
pub use owner::{ConnectionPoint, Deferred, OwnerCapabilities, RegisteredOwner};
pub use world::{PhysicsWorld, TickStats};

pub use mech_constraint::Constraint;
