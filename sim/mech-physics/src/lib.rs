//! Unified mechanism and gas simulation.
//!
//! This crate ties the layers together:
//!
//! - [`mech_types`]: handles, state, configuration and errors
//! - [`mech_constraint`]: constraints and the constraint solver
//! - [`mech_core`]: the rigid-body world and its integrator
//! - [`mech_gas`]: gas cells, boundaries and the gas network
//!
//! [`Simulation`] advances a [`PhysicsWorld`](mech_core::PhysicsWorld) and a
//! [`GasNetwork`](mech_gas::GasNetwork) on one clock. [`SimulationWorker`]
//! moves a simulation onto its own thread and drives it through a
//! begin/finish handshake.
//!
//! # Quick Start
//!
//! ```
//! use mech_physics::prelude::*;
//!
//! let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
//! let body = sim
//!     .physics_mut()
//!     .add_body(RigidBody::new(1.0, Pose2::from_xy(0.0, 1.0)).unwrap());
//! sim.physics_mut()
//!     .add_constraint(Box::new(LockYConstraint::new(body, 1.0)))
//!     .unwrap();
//!
//! let mut worker = SimulationWorker::spawn(sim).unwrap();
//! let report = worker.tick(1.0 / 20.0).unwrap();
//! assert_eq!(report.snapshot.tick, 1);
//! ```
//!
//! # Architecture
//!
//! ```text
//!                ┌─────────────────────────────┐
//!                │  mech-physics (this crate)  │
//!                │  Simulation, worker thread  │
//!                └──────────────┬──────────────┘
//!                               │
//!              ┌────────────────┴───────────────┐
//!              ▼                                ▼
//!     ┌─────────────────┐              ┌─────────────────┐
//!     │    mech-core    │              │    mech-gas     │
//!     │  PhysicsWorld   │              │   GasNetwork    │
//!     └────────┬────────┘              └────────┬────────┘
//!              ▼                                │
//!     ┌─────────────────┐                       │
//!     │ mech-constraint │                       │
//!     │ Solver, joints  │                       │
//!     └────────┬────────┘                       │
//!              └───────────────┬────────────────┘
//!                              ▼
//!                     ┌─────────────────┐
//!                     │   mech-types    │
//!                     │  Data structs   │
//!                     └─────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/mech-physics/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::missing_errors_doc)]

// Re-export sub-crates
pub use mech_constraint;
pub use mech_core;
pub use mech_gas;
pub use mech_types;

// Re-export nalgebra for convenience
pub use nalgebra;

mod simulation;
mod worker;

pub use simulation::{Simulation, SimulationStats, Snapshot};
pub use worker::{Mutation, SimulationWorker, TickReport};

/// Prelude module for convenient imports.
///
/// ```
/// use mech_physics::prelude::*;
/// ```
pub mod prelude {
    // ========================================================================
    // Core types from mech-types
    // ========================================================================

    pub use mech_types::{
        BodyHandle, BoundaryHandle, CellHandle, ConstraintHandle, HookHandle, OwnerHandle,
    };
    pub use mech_types::{ConnectionType, Direction, PhysicalState, Pose2};
    pub use mech_types::{
        BaumgarteGains, GasConfig, PhysicsConfig, Preconditioner, SimulationConfig, SolverConfig,
    };
    pub use mech_types::{Result, SimError};

    // ========================================================================
    // Constraints from mech-constraint
    // ========================================================================

    pub use mech_constraint::{
        BearingConstraint, Constraint, LockYConstraint, PistonConstraint, PositionConstraint,
        RotationConstraint, TravelLimit, WeldConstraint,
    };

    // ========================================================================
    // World from mech-core
    // ========================================================================

    pub use mech_core::{
        ConnectionPoint, EnergyMeter, ForceGenerator, OwnerCapabilities, PhysicsWorld, RigidBody,
        StepHandler, TickStats,
    };

    // ========================================================================
    // Gas from mech-gas
    // ========================================================================

    pub use mech_gas::{
        FlowOutcome, GasBoundary, GasCell, GasCellProvider, GasCellState, GasNetwork, GasPort,
        GasTickStats,
    };

    // ========================================================================
    // Context and worker
    // ========================================================================

    pub use crate::{Simulation, SimulationStats, SimulationWorker, Snapshot, TickReport};

    pub use nalgebra::{Vector2, Vector3};
}
