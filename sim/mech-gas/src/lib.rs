//! Zero-dimensional compressible gas transport.
//!
//! Gas lives in [`GasCell`]s: control volumes whose state is internal
//! energy, mole count and bulk momentum. Cells exchange gas through
//! [`GasBoundary`]s using the isentropic orifice model in [`flow`], choked
//! below the critical pressure ratio and subsonic above it. The
//! [`GasNetwork`] owns the cells and boundaries and steps them together.
//!
//! Moles and momentum are conserved by every transfer. Energy is conserved
//! up to the bulk kinetic energy the axial exchange converts into heat.
//!
//! # Example
//!
//! ```
//! use mech_gas::{GasCell, GasNetwork, GasPort};
//! use mech_types::{Direction, GasConfig};
//!
//! let mut net = GasNetwork::new(GasConfig::default()).unwrap();
//! let tank = net.add_cell(GasCell::new(1.0).unwrap().with_gas(40.0, 300.0));
//! let room = net.add_cell(GasCell::new(10.0).unwrap().with_gas(4.0, 300.0));
//! net.connect(GasPort::new(tank), GasPort::new(room), Direction::East).unwrap();
//!
//! let before = net.total_moles();
//! net.simulate(0.01).unwrap();
//! assert!(net.cell(tank).unwrap().moles() < 40.0);
//! assert!((net.total_moles() - before).abs() < 1e-9);
//! ```

#![doc(html_root_url = "https://docs.rs/mech-gas/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::missing_errors_doc)]

mod boundary;
mod cell;
pub mod flow;
mod network;

pub use boundary::{FlowOutcome, GasBoundary, GasPort};
pub use cell::{GasCell, GasCellState};
pub use network::{GasCellProvider, GasNetwork, GasTickStats};
