//! Configuration types for simulation.
//!
//! This module provides configuration types that control how the simulation
//! runs: sub-step count, stabilization gains, solver tolerances and gas
//! transfer limits.

use crate::{Result, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Top-level configuration for a simulation context.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// Rigid body configuration.
    pub physics: PhysicsConfig,
    /// Gas transport configuration.
    pub gas: GasConfig,
}

impl SimulationConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.physics.validate()?;
        self.gas.validate()
    }
}

/// Configuration for a physics world.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhysicsConfig {
    /// Sub-steps per external tick.
    pub steps: usize,
    /// Baumgarte stabilization gains.
    pub baumgarte: BaumgarteGains,
    /// Constraint solver configuration.
    pub solver: SolverConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            baumgarte: BaumgarteGains::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl PhysicsConfig {
    /// Fewer sub-steps for large scenes where accuracy matters less.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            steps: 20,
            ..Default::default()
        }
    }

    /// Set the number of sub-steps per tick.
    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Set the solver configuration.
    #[must_use]
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(SimError::invalid_config("steps must be at least 1"));
        }
        self.baumgarte.validate()?;
        self.solver.validate()
    }
}

/// Gains of the Baumgarte feedback `C̈ + k_d·Ċ + k_s·C = 0`.
///
/// Instantaneous correction is unstable, so constraint drift is pulled back
/// over several steps instead.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BaumgarteGains {
    /// Position error gain `k_s`.
    pub stiffness: f64,
    /// Velocity error gain `k_d`.
    pub damping: f64,
}

impl Default for BaumgarteGains {
    fn default() -> Self {
        Self {
            stiffness: 10.0,
            damping: 2.0,
        }
    }
}

impl BaumgarteGains {
    /// Validate the gains.
    pub fn validate(&self) -> Result<()> {
        if !(self.stiffness.is_finite() && self.stiffness >= 0.0) {
            return Err(SimError::invalid_config("baumgarte stiffness must be >= 0"));
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(SimError::invalid_config("baumgarte damping must be >= 0"));
        }
        Ok(())
    }
}

/// Preconditioner used by the conjugate-gradient iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Preconditioner {
    /// No preconditioning.
    #[default]
    None,
    /// Diagonal (Jacobi) preconditioning.
    Jacobi,
}

/// Configuration for the constraint solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Maximum conjugate-gradient iterations per solve.
    pub max_iterations: usize,
    /// Minimum iterations before the convergence test is applied.
    pub min_iterations: usize,
    /// Per-row tolerance relative to the right-hand side entry.
    pub relative_tolerance: f64,
    /// Per-row absolute tolerance floor.
    pub absolute_tolerance: f64,
    /// Start each solve from the previous multipliers when sizes match.
    pub warm_starting: bool,
    /// Preconditioner type.
    pub preconditioner: Preconditioner,
    /// Gauss-Newton passes allowed for the rest-pose solve.
    pub rest_passes: usize,
    /// Largest constraint error accepted by the rest-pose solve.
    pub rest_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1024,
            min_iterations: 0,
            relative_tolerance: 0.01,
            absolute_tolerance: 1e-3,
            warm_starting: true,
            preconditioner: Preconditioner::None,
            rest_passes: 16,
            rest_tolerance: 1e-10,
        }
    }
}

impl SolverConfig {
    /// Tighter tolerances for small scenes and tests.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            relative_tolerance: 1e-6,
            absolute_tolerance: 1e-9,
            min_iterations: 1,
            preconditioner: Preconditioner::Jacobi,
            ..Default::default()
        }
    }

    /// Set the preconditioner type.
    #[must_use]
    pub const fn with_preconditioner(mut self, preconditioner: Preconditioner) -> Self {
        self.preconditioner = preconditioner;
        self
    }

    /// Enable or disable warm starting.
    #[must_use]
    pub const fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    /// Set the maximum iteration count.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(SimError::invalid_config("max_iterations must be at least 1"));
        }
        if self.min_iterations > self.max_iterations {
            return Err(SimError::invalid_config(
                "min_iterations exceeds max_iterations",
            ));
        }
        if !(self.relative_tolerance >= 0.0 && self.absolute_tolerance > 0.0) {
            return Err(SimError::invalid_config(
                "solver tolerances must be non-negative with a positive floor",
            ));
        }
        if !(self.rest_tolerance > 0.0) {
            return Err(SimError::invalid_config("rest_tolerance must be positive"));
        }
        Ok(())
    }
}

/// Configuration for gas transport.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GasConfig {
    /// Largest fraction of a source cell's moles moved through one boundary
    /// in one step.
    pub max_transfer_fraction: f64,
    /// Redistribute momentum along boundary axes after each transfer.
    pub axial_momentum_exchange: bool,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            max_transfer_fraction: 0.9,
            axial_momentum_exchange: true,
        }
    }
}

impl GasConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_transfer_fraction > 0.0 && self.max_transfer_fraction <= 1.0) {
            return Err(SimError::invalid_config(
                "max_transfer_fraction must lie in (0, 1]",
            ));
        }
        Ok(())
    }
}
