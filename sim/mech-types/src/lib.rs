//! Core types for planar mechanism and gas-cell simulation.
//!
//! This crate provides the foundational types shared by the simulation
//! crates:
//!
//! - [`PhysicalState`] / [`Pose2`] - Planar rigid body state
//! - [`Arena`] and typed handles - Generation-tagged slot storage
//! - [`Direction`] / [`ConnectionType`] - Block faces and coupling kinds
//! - [`SimulationConfig`] - Sub-steps, solver and gas settings
//! - [`SimError`] - The error type used across the workspace
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They carry no dynamics; the constraint
//! solver, the world and the gas network give them meaning.
//!
//! # Coordinate System
//!
//! Rigid bodies move in the XY plane (Y up) and rotate about Z. Gas momentum
//! and boundary axes are full 3D vectors because cells sit on a block grid.
//!
//! # Example
//!
//! ```
//! use mech_types::{PhysicalState, Pose2};
//! use nalgebra::Vector2;
//!
//! let state = PhysicalState::at_rest(Pose2::from_xy(0.0, 1.0))
//!     .with_velocity(Vector2::new(2.0, 0.0));
//!
//! assert_eq!(state.position.y, 1.0);
//! assert_eq!(state.velocity.x, 2.0);
//! ```

#![doc(html_root_url = "https://docs.rs/mech-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod arena;
mod config;
mod direction;
mod error;
mod state;

pub use arena::{
    Arena, BodyHandle, BoundaryHandle, CellHandle, ConstraintHandle, Handle, HookHandle,
    OwnerHandle,
};
pub use config::{
    BaumgarteGains, GasConfig, PhysicsConfig, Preconditioner, SimulationConfig, SolverConfig,
};
pub use direction::{ConnectionType, Direction};
pub use error::SimError;
pub use state::{PhysicalState, Pose2};

// Re-export math types for convenience
pub use nalgebra::{Vector2, Vector3};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
