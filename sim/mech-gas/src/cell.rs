//! Zero-dimensional gas cells.
//!
//! A cell is a control volume holding an amount of monatomic ideal gas. Its
//! state is the internal energy, the mole count and the bulk momentum; every
//! thermodynamic quantity is derived from those on demand.

use mech_types::{Result, SimError, Vector3};

use crate::flow::{DEFAULT_MOLAR_MASS, ENERGY_FACTOR, GAMMA, GAS_CONSTANT, ISENTROPIC_EXPONENT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Persisted state of a cell: energy, moles and momentum components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GasCellState {
    /// Internal energy (J).
    pub energy: f64,
    /// Amount of gas (mol).
    pub moles: f64,
    /// Momentum along x (kg·m/s).
    pub momentum_x: f64,
    /// Momentum along y (kg·m/s).
    pub momentum_y: f64,
    /// Momentum along z (kg·m/s).
    pub momentum_z: f64,
}

/// A control volume of ideal gas.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GasCell {
    volume: f64,
    energy: f64,
    moles: f64,
    momentum: Vector3<f64>,
    molar_mass: f64,
}

impl GasCell {
    /// An empty cell of `volume` cubic metres.
    pub fn new(volume: f64) -> Result<Self> {
        if !(volume.is_finite() && volume > 0.0) {
            return Err(SimError::invalid_config(format!(
                "gas cell volume must be positive, got {volume}"
            )));
        }
        Ok(Self {
            volume,
            energy: 0.0,
            moles: 0.0,
            momentum: Vector3::zeros(),
            molar_mass: DEFAULT_MOLAR_MASS,
        })
    }

    /// Fill with `moles` of gas at `temperature` kelvin.
    #[must_use]
    pub fn with_gas(mut self, moles: f64, temperature: f64) -> Self {
        self.moles = moles.max(0.0);
        self.energy = (ENERGY_FACTOR * self.moles * GAS_CONSTANT * temperature).max(0.0);
        self
    }

    /// Set the bulk momentum.
    #[must_use]
    pub fn with_momentum(mut self, momentum: Vector3<f64>) -> Self {
        self.momentum = momentum;
        self
    }

    /// Set the molar mass (kg/mol).
    #[must_use]
    pub fn with_molar_mass(mut self, molar_mass: f64) -> Self {
        self.molar_mass = molar_mass;
        self
    }

    /// Volume (m³).
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Internal energy (J).
    #[must_use]
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Amount of gas (mol).
    #[must_use]
    pub fn moles(&self) -> f64 {
        self.moles
    }

    /// Bulk momentum.
    #[must_use]
    pub fn momentum(&self) -> Vector3<f64> {
        self.momentum
    }

    /// Molar mass (kg/mol).
    #[must_use]
    pub fn molar_mass(&self) -> f64 {
        self.molar_mass
    }

    /// `P = E / (1.5·V)`.
    #[must_use]
    pub fn pressure(&self) -> f64 {
        self.energy / (ENERGY_FACTOR * self.volume)
    }

    /// `T = E / (1.5·n·R)`, zero for an empty cell.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        if self.moles > 0.0 {
            self.energy / (ENERGY_FACTOR * self.moles * GAS_CONSTANT)
        } else {
            0.0
        }
    }

    /// Gas mass (kg).
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.moles * self.molar_mass
    }

    /// Mass density (kg/m³).
    #[must_use]
    pub fn density(&self) -> f64 {
        self.mass() / self.volume
    }

    /// Bulk velocity, zero for an empty cell.
    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        let mass = self.mass();
        if mass > 0.0 {
            self.momentum / mass
        } else {
            Vector3::zeros()
        }
    }

    /// `sqrt(γ·P/ρ)`, zero for an empty cell.
    #[must_use]
    pub fn speed_of_sound(&self) -> f64 {
        let density = self.density();
        if density > 0.0 {
            (GAMMA * self.pressure() / density).sqrt()
        } else {
            0.0
        }
    }

    /// Kinetic energy of the bulk motion, `|p|² / 2m`.
    #[must_use]
    pub fn bulk_kinetic_energy(&self) -> f64 {
        let mass = self.mass();
        if mass > 0.0 {
            self.momentum.norm_squared() / (2.0 * mass)
        } else {
            0.0
        }
    }

    /// Pressure seen by an observer looking along `direction`.
    ///
    /// Flow toward the observer adds the isentropic ram term
    /// `P·((1 + (γ−1)/2·Ma²)^(γ/(γ−1)) − 1)`, flow away subtracts it. The
    /// result never drops below zero; a `NaN` state stays `NaN`.
    #[must_use]
    pub fn dynamic_pressure(&self, direction: &Vector3<f64>) -> f64 {
        let pressure = self.pressure();
        let sound = self.speed_of_sound();
        if sound == 0.0 {
            return pressure;
        }
        let mach = self.velocity().dot(direction) / sound;
        let ram = pressure
            * ((1.0 + 0.5 * (GAMMA - 1.0) * mach * mach).powf(ISENTROPIC_EXPONENT) - 1.0);
        let value = pressure + mach.signum() * ram;
        if value.is_nan() {
            value
        } else {
            value.max(0.0)
        }
    }

    /// Add `delta` joules, clamping at zero.
    pub fn change_energy(&mut self, delta: f64) {
        self.energy = (self.energy + delta).max(0.0);
    }

    /// Add `delta` moles, clamping at zero.
    pub fn change_moles(&mut self, delta: f64) {
        self.moles = (self.moles + delta).max(0.0);
    }

    /// Add `delta` to the momentum.
    pub fn change_momentum(&mut self, delta: Vector3<f64>) {
        self.momentum += delta;
    }

    /// Change the volume by `delta` through a piston of the cell's
    /// equivalent cube face (`edge = ∛V`, `area = edge²`).
    ///
    /// Returns the work added to the internal energy.
    pub fn change_volume(&mut self, delta: f64) -> Result<f64> {
        let edge = self.volume.cbrt();
        let area = edge * edge;
        self.change_volume_by(area, delta / area)
    }

    /// Move a piston of `area` by `length_delta` (positive expands).
    ///
    /// The work `P·area·(−length_delta)` is added to the internal energy,
    /// which is clamped at zero. Returns the work.
    pub fn change_volume_by(&mut self, area: f64, length_delta: f64) -> Result<f64> {
        let volume = self.volume + area * length_delta;
        if !(volume.is_finite() && volume > 0.0) {
            return Err(SimError::invariant(format!(
                "volume change would leave {volume} m³"
            )));
        }
        let work = self.pressure() * area * -length_delta;
        self.volume = volume;
        self.change_energy(work);
        Ok(work)
    }

    /// Persisted state.
    #[must_use]
    pub fn state(&self) -> GasCellState {
        GasCellState {
            energy: self.energy,
            moles: self.moles,
            momentum_x: self.momentum.x,
            momentum_y: self.momentum.y,
            momentum_z: self.momentum.z,
        }
    }

    /// Restore a persisted state. Negative energy or moles are clamped.
    pub fn set_state(&mut self, state: &GasCellState) {
        self.energy = state.energy.max(0.0);
        self.moles = state.moles.max(0.0);
        self.momentum = Vector3::new(state.momentum_x, state.momentum_y, state.momentum_z);
    }
}
