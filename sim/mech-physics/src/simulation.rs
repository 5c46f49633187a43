//! The combined mechanism and gas context.

use mech_core::{PhysicsWorld, TickStats};
use mech_gas::{GasCellState, GasNetwork, GasTickStats};
use mech_types::{BodyHandle, CellHandle, PhysicalState, Result, SimError, SimulationConfig};
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What one tick of the whole simulation did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulationStats {
    /// Rigid-body diagnostics.
    pub physics: TickStats,
    /// Gas boundary counts.
    pub gas: GasTickStats,
}

/// Copy of the observable state after a tick.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    /// Completed ticks.
    pub tick: u64,
    /// Simulated time (s).
    pub time: f64,
    /// Every live body with its state.
    pub bodies: Vec<(BodyHandle, PhysicalState)>,
    /// Every live gas cell with its persisted state.
    pub cells: Vec<(CellHandle, GasCellState)>,
}

impl Snapshot {
    /// State of `body`, if it was live.
    #[must_use]
    pub fn body(&self, body: BodyHandle) -> Option<&PhysicalState> {
        self.bodies.iter().find(|(h, _)| *h == body).map(|(_, s)| s)
    }

    /// State of `cell`, if it was live.
    #[must_use]
    pub fn cell(&self, cell: CellHandle) -> Option<&GasCellState> {
        self.cells.iter().find(|(h, _)| *h == cell).map(|(_, s)| s)
    }
}

/// Rigid bodies and gas cells advanced together on one clock.
#[derive(Debug, Default)]
pub struct Simulation {
    config: SimulationConfig,
    physics: PhysicsWorld,
    gas: GasNetwork,
    tick: u64,
    time: f64,
}

impl Simulation {
    /// Create an empty simulation.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            physics: PhysicsWorld::new(config.physics.clone())?,
            gas: GasNetwork::new(config.gas)?,
            config,
            tick: 0,
            time: 0.0,
        })
    }

    /// Configuration the simulation was built with.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The rigid-body world.
    #[must_use]
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// The rigid-body world, mutably.
    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    /// The gas network.
    #[must_use]
    pub fn gas(&self) -> &GasNetwork {
        &self.gas
    }

    /// The gas network, mutably.
    pub fn gas_mut(&mut self) -> &mut GasNetwork {
        &mut self.gas
    }

    /// Completed ticks.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated time (s).
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advance bodies then gas by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> Result<SimulationStats> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimestep(dt));
        }
        let physics = self.physics.tick(dt)?;
        let gas = self.gas.simulate(dt)?;
        self.tick += 1;
        self.time += dt;
        trace!(tick = self.tick, "simulation tick complete");
        Ok(SimulationStats { physics, gas })
    }

    /// Copy out the current state of every body and cell.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            time: self.time,
            bodies: self
                .physics
                .bodies()
                .iter()
                .map(|(h, b)| (h, *b.state()))
                .collect(),
            cells: self.gas.cells().map(|(h, c)| (h, c.state())).collect(),
        }
    }
}
