//! Flow conduits between pairs of cells.
//!
//! Each step a boundary:
//!
//! 1. reads both effective pressures, including the ram correction along
//!    the boundary axis (cell 1 looks along `+axis`, cell 2 along `−axis`);
//! 2. picks the higher side as the source, ties going from cell 1 to cell 2;
//! 3. evaluates the orifice flow rate, scales it by `dt` and the flow
//!    constant, and caps it at a fraction of the source's moles;
//! 4. moves moles, energy and momentum in that proportion;
//! 5. pulls the axial momentum of both cells toward their shared bulk
//!    velocity and takes the resulting change in bulk kinetic energy out of
//!    (or back into) the internal energy.
//!
//! A `NaN` effective pressure on either side skips the boundary for the step
//! and leaves both cells untouched.

use mech_types::{Arena, CellHandle, Direction, GasConfig, Result, SimError, Vector3};
use tracing::warn;

use crate::cell::GasCell;
use crate::flow::mole_flow_rate;

/// One side of a boundary: a cell and its opening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasPort {
    /// Cell behind the opening.
    pub cell: CellHandle,
    /// Opening cross-section (m²). Carried onto the boundary for callers;
    /// the transfer rate does not depend on it.
    pub cross_section: f64,
    /// Flow constant of the opening, in `[0, 1]`.
    pub flow_constant: f64,
}

impl GasPort {
    /// Port of `cell` with unit cross-section and full flow.
    #[must_use]
    pub fn new(cell: CellHandle) -> Self {
        Self {
            cell,
            cross_section: 1.0,
            flow_constant: 1.0,
        }
    }

    /// Set the cross-section.
    #[must_use]
    pub fn with_cross_section(mut self, cross_section: f64) -> Self {
        self.cross_section = cross_section;
        self
    }

    /// Set the flow constant.
    #[must_use]
    pub fn with_flow_constant(mut self, flow_constant: f64) -> Self {
        self.flow_constant = flow_constant;
        self
    }
}

/// What a boundary did in one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowOutcome {
    /// Gas moved from `from` to `to`.
    Transferred {
        /// Source cell.
        from: CellHandle,
        /// Sink cell.
        to: CellHandle,
        /// Moles moved.
        moles: f64,
    },
    /// Pressures balanced or the source is empty.
    Idle,
    /// A `NaN` pressure was seen; nothing changed.
    Skipped,
}

/// A directed conduit between two cells.
///
/// The cells are stored so that the axis points from `cell1` to `cell2`
/// along a positive direction. Port cross-sections are recorded but do not
/// scale the flow; the flow constant alone throttles the opening.
#[derive(Debug, Clone, PartialEq)]
pub struct GasBoundary {
    cell1: CellHandle,
    cell2: CellHandle,
    axis: Direction,
    cross_section1: f64,
    cross_section2: f64,
    flow_constant: f64,
}

impl GasBoundary {
    /// Join port `a` to port `b`, where `towards_b` is the side of `a`'s
    /// cell that faces `b`.
    pub fn new(a: GasPort, b: GasPort, towards_b: Direction) -> Result<Self> {
        if a.cell == b.cell {
            return Err(SimError::invariant(format!(
                "boundary would join {} to itself",
                a.cell
            )));
        }
        let (first, second, axis) = if towards_b.is_positive() {
            (a, b, towards_b)
        } else {
            (b, a, towards_b.opposite())
        };
        Ok(Self {
            cell1: first.cell,
            cell2: second.cell,
            axis,
            cross_section1: first.cross_section,
            cross_section2: second.cross_section,
            flow_constant: a.flow_constant.min(b.flow_constant).clamp(0.0, 1.0),
        })
    }

    /// Cell on the negative end of the axis.
    #[must_use]
    pub fn cell1(&self) -> CellHandle {
        self.cell1
    }

    /// Cell on the positive end of the axis.
    #[must_use]
    pub fn cell2(&self) -> CellHandle {
        self.cell2
    }

    /// Axis direction, always positive.
    #[must_use]
    pub fn axis(&self) -> Direction {
        self.axis
    }

    /// Cross-sections of the cell 1 and cell 2 openings, as given by the
    /// ports. Informational only.
    #[must_use]
    pub fn cross_sections(&self) -> (f64, f64) {
        (self.cross_section1, self.cross_section2)
    }

    /// Combined flow constant, the smaller of the two sides.
    #[must_use]
    pub fn flow_constant(&self) -> f64 {
        self.flow_constant
    }

    /// Whether the boundary touches `cell`.
    #[must_use]
    pub fn touches(&self, cell: CellHandle) -> bool {
        self.cell1 == cell || self.cell2 == cell
    }

    /// Run one flow step of length `dt`.
    pub fn simulate(
        &self,
        dt: f64,
        cells: &mut Arena<GasCell>,
        config: &GasConfig,
    ) -> Result<FlowOutcome> {
        for cell in [self.cell1, self.cell2] {
            if !cells.contains(cell.raw()) {
                return Err(cell.stale());
            }
        }
        let (c1, c2) = cells
            .get2_mut(self.cell1.raw(), self.cell2.raw())
            .ok_or_else(|| SimError::invariant("boundary cells share a slot"))?;

        let axis = self.axis.unit();
        let p1 = c1.dynamic_pressure(&axis);
        let p2 = c2.dynamic_pressure(&-axis);
        if p1.is_nan() || p2.is_nan() {
            warn!(cell1 = %self.cell1, cell2 = %self.cell2, "NaN pressure, boundary skipped");
            return Ok(FlowOutcome::Skipped);
        }

        let forward = p1 >= p2;
        let (source, sink, p_source, p_sink) = if forward {
            (&mut *c1, &mut *c2, p1, p2)
        } else {
            (&mut *c2, &mut *c1, p2, p1)
        };

        let rate = mole_flow_rate(p_source, p_sink, source.temperature());
        let moles = (rate * dt * self.flow_constant)
            .min(config.max_transfer_fraction * source.moles());
        if !(moles > 0.0) {
            return Ok(FlowOutcome::Idle);
        }

        let fraction = moles / source.moles();
        let energy = source.energy() * fraction;
        let momentum = source.momentum() * fraction;
        source.change_moles(-moles);
        sink.change_moles(moles);
        source.change_energy(-energy);
        sink.change_energy(energy);
        source.change_momentum(-momentum);
        sink.change_momentum(momentum);

        if config.axial_momentum_exchange {
            exchange_axial_momentum(c1, c2, &axis, self.flow_constant);
        }

        let (from, to) = if forward {
            (self.cell1, self.cell2)
        } else {
            (self.cell2, self.cell1)
        };
        Ok(FlowOutcome::Transferred { from, to, moles })
    }
}

/// Blend the axial momentum of both cells toward their shared bulk velocity.
///
/// The shared velocity is clamped to the slower speed of sound of the two
/// cells. The exchange is zero-sum, so total momentum is unchanged; the
/// change in each cell's bulk kinetic energy is charged to its internal
/// energy.
fn exchange_axial_momentum(c1: &mut GasCell, c2: &mut GasCell, axis: &Vector3<f64>, blend: f64) {
    let (m1, m2) = (c1.mass(), c2.mass());
    if !(m1 > 0.0 && m2 > 0.0) {
        return;
    }
    let (ke1, ke2) = (c1.bulk_kinetic_energy(), c2.bulk_kinetic_energy());

    let axial1 = c1.momentum().dot(axis);
    let axial2 = c2.momentum().dot(axis);
    let limit = c1.speed_of_sound().min(c2.speed_of_sound());
    let shared = ((axial1 + axial2) / (m1 + m2)).clamp(-limit, limit);

    let exchange = blend * (m1 * shared - axial1);
    c1.change_momentum(axis * exchange);
    c2.change_momentum(axis * -exchange);

    c1.change_energy(ke1 - c1.bulk_kinetic_energy());
    c2.change_energy(ke2 - c2.bulk_kinetic_energy());
}
