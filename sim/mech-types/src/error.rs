//! Error types for simulation operations.

use thiserror::Error;

/// Errors that can occur during simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A handle refers to a slot that was freed or reused.
    #[error("stale handle: slot {index} generation {generation}")]
    StaleHandle {
        /// Slot index carried by the handle.
        index: u32,
        /// Generation carried by the handle.
        generation: u32,
    },

    /// Invalid mass for a rigid body.
    #[error("invalid mass: {0} (must be positive and finite)")]
    InvalidMass(f64),

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Simulation diverged (`NaN` or `Inf` detected).
    #[error("simulation diverged: {reason}")]
    Diverged {
        /// Description of what went wrong.
        reason: String,
    },

    /// A structural contract was broken by the caller.
    #[error("invariant violated: {reason}")]
    InvariantViolation {
        /// Description of the violated contract.
        reason: String,
    },

    /// A tick panicked and was abandoned by the worker.
    #[error("tick {tick} aborted: {reason}")]
    TickAborted {
        /// Tick counter at the time of the fault.
        tick: u64,
        /// Panic payload, when it was a string.
        reason: String,
    },

    /// The simulation worker is gone.
    #[error("simulation worker disconnected")]
    WorkerDisconnected,
}

impl SimError {
    /// Create a diverged error.
    #[must_use]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invariant violation error.
    #[must_use]
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Check if this is a stale handle error.
    #[must_use]
    pub fn is_stale_handle(&self) -> bool {
        matches!(self, Self::StaleHandle { .. })
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}
