//! Registry of gas cells and the boundaries between them.

use hashbrown::HashMap;
use mech_types::{
    Arena, BoundaryHandle, CellHandle, Direction, GasConfig, Result, SimError, Vector3,
};
use tracing::{debug, trace};

use crate::boundary::{FlowOutcome, GasBoundary, GasPort};
use crate::cell::GasCell;

/// Something that can expose a gas opening on one of its sides.
pub trait GasCellProvider {
    /// The opening on `side`, if there is one.
    fn gas_port(&self, side: Direction) -> Option<GasPort>;
}

/// Counts of what the boundaries did in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasTickStats {
    /// Boundaries that moved gas.
    pub transferred: usize,
    /// Boundaries with nothing to move.
    pub idle: usize,
    /// Boundaries skipped on a `NaN` pressure.
    pub skipped: usize,
}

/// Cells, boundaries and the port index joining them.
#[derive(Debug, Default)]
pub struct GasNetwork {
    config: GasConfig,
    cells: Arena<GasCell>,
    boundaries: Arena<GasBoundary>,
    ports: HashMap<(CellHandle, Direction), BoundaryHandle>,
}

impl GasNetwork {
    /// Create an empty network.
    pub fn new(config: GasConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Network configuration.
    #[must_use]
    pub fn config(&self) -> &GasConfig {
        &self.config
    }

    /// Number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of boundaries.
    #[must_use]
    pub fn boundary_count(&self) -> usize {
        self.boundaries.len()
    }

    /// Add a cell.
    pub fn add_cell(&mut self, cell: GasCell) -> CellHandle {
        CellHandle::new(self.cells.insert(cell))
    }

    /// Remove a cell together with every boundary touching it.
    pub fn remove_cell(&mut self, handle: CellHandle) -> Result<GasCell> {
        let cell = self.cells.remove(handle.raw()).ok_or_else(|| handle.stale())?;
        let attached: Vec<BoundaryHandle> = self
            .boundaries
            .iter()
            .filter(|(_, b)| b.touches(handle))
            .map(|(h, _)| BoundaryHandle::new(h))
            .collect();
        for boundary in &attached {
            self.detach(*boundary);
        }
        debug!(%handle, boundaries = attached.len(), "gas cell removed");
        Ok(cell)
    }

    /// Look up a cell.
    #[must_use]
    pub fn cell(&self, handle: CellHandle) -> Option<&GasCell> {
        self.cells.get(handle.raw())
    }

    /// Look up a cell mutably.
    pub fn cell_mut(&mut self, handle: CellHandle) -> Option<&mut GasCell> {
        self.cells.get_mut(handle.raw())
    }

    /// Iterate over the cells.
    pub fn cells(&self) -> impl Iterator<Item = (CellHandle, &GasCell)> {
        self.cells.iter().map(|(h, c)| (CellHandle::new(h), c))
    }

    /// Look up a boundary.
    #[must_use]
    pub fn boundary(&self, handle: BoundaryHandle) -> Option<&GasBoundary> {
        self.boundaries.get(handle.raw())
    }

    /// Join port `a` to port `b`; `towards_b` is the side of `a` facing `b`.
    ///
    /// Each side of a cell holds at most one boundary.
    pub fn connect(
        &mut self,
        a: GasPort,
        b: GasPort,
        towards_b: Direction,
    ) -> Result<BoundaryHandle> {
        for cell in [a.cell, b.cell] {
            if !self.cells.contains(cell.raw()) {
                return Err(cell.stale());
            }
        }
        let keys = [(a.cell, towards_b), (b.cell, towards_b.opposite())];
        for key in &keys {
            if self.ports.contains_key(key) {
                return Err(SimError::invariant(format!(
                    "{} already has a boundary on its {:?} side",
                    key.0, key.1
                )));
            }
        }

        let boundary = GasBoundary::new(a, b, towards_b)?;
        let handle = BoundaryHandle::new(self.boundaries.insert(boundary));
        for key in keys {
            self.ports.insert(key, handle);
        }
        debug!(%handle, cell_a = %a.cell, cell_b = %b.cell, ?towards_b, "gas boundary added");
        Ok(handle)
    }

    /// Join two providers if both expose a port on the facing sides.
    pub fn connect_providers(
        &mut self,
        a: &dyn GasCellProvider,
        b: &dyn GasCellProvider,
        towards_b: Direction,
    ) -> Result<Option<BoundaryHandle>> {
        let (Some(port_a), Some(port_b)) =
            (a.gas_port(towards_b), b.gas_port(towards_b.opposite()))
        else {
            return Ok(None);
        };
        self.connect(port_a, port_b, towards_b).map(Some)
    }

    /// Remove a boundary.
    pub fn disconnect(&mut self, handle: BoundaryHandle) -> Result<GasBoundary> {
        self.detach(handle).ok_or_else(|| handle.stale())
    }

    fn detach(&mut self, handle: BoundaryHandle) -> Option<GasBoundary> {
        let boundary = self.boundaries.remove(handle.raw())?;
        self.ports.retain(|_, h| *h != handle);
        Some(boundary)
    }

    /// The boundary on `side` of `cell`.
    ///
    /// Asking for a side with nothing registered is a caller error.
    pub fn boundary_at(&self, cell: CellHandle, side: Direction) -> Result<BoundaryHandle> {
        self.ports.get(&(cell, side)).copied().ok_or_else(|| {
            SimError::invariant(format!("no gas boundary on the {side:?} side of {cell}"))
        })
    }

    /// Run every boundary once with step `dt`.
    pub fn simulate(&mut self, dt: f64) -> Result<GasTickStats> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimestep(dt));
        }
        let mut stats = GasTickStats::default();
        for (_, boundary) in self.boundaries.iter() {
            match boundary.simulate(dt, &mut self.cells, &self.config)? {
                FlowOutcome::Transferred { .. } => stats.transferred += 1,
                FlowOutcome::Idle => stats.idle += 1,
                FlowOutcome::Skipped => stats.skipped += 1,
            }
        }
        trace!(
            transferred = stats.transferred,
            idle = stats.idle,
            skipped = stats.skipped,
            "gas step"
        );
        Ok(stats)
    }

    /// Moles held by all cells.
    #[must_use]
    pub fn total_moles(&self) -> f64 {
        self.cells.iter().map(|(_, c)| c.moles()).sum()
    }

    /// Momentum held by all cells.
    #[must_use]
    pub fn total_momentum(&self) -> Vector3<f64> {
        self.cells
            .iter()
            .fold(Vector3::zeros(), |acc, (_, c)| acc + c.momentum())
    }

    /// Internal energy held by all cells.
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.cells.iter().map(|(_, c)| c.energy()).sum()
    }
}
