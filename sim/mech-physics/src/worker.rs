//! A simulation running on its own thread.
//!
//! The host drives the worker with a two-phase handshake:
//!
//! ```text
//! host                          worker
//! ----                          ------
//! defer(f) ──── mutations ────▶ (queued)
//! begin_tick(dt) ── Tick ─────▶ drain mutations, tick, snapshot
//!   ... host work ...
//! finish_tick() ◀── report ───  (blocks until the tick is done)
//! ```
//!
//! Only one tick is in flight at a time, and queued mutations are applied
//! at the start of the next tick, never in the middle of one. The host only
//! sees the state through the [`Snapshot`] in the report.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use mech_types::{Result, SimError};
use tracing::{debug, warn};

use crate::simulation::{Simulation, SimulationStats, Snapshot};

/// A structural change applied on the worker thread before a tick.
pub type Mutation = Box<dyn FnOnce(&mut Simulation) + Send>;

/// Result of one completed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Deferred mutations applied before the tick.
    pub mutations: usize,
    /// Diagnostics of the tick.
    pub stats: SimulationStats,
    /// State after the tick.
    pub snapshot: Snapshot,
}

enum Command {
    Tick(f64),
}

/// Owns a [`Simulation`] on a dedicated thread.
#[derive(Debug)]
pub struct SimulationWorker {
    commands: Option<Sender<Command>>,
    mutations: Sender<Mutation>,
    reports: Receiver<Result<TickReport>>,
    thread: Option<JoinHandle<Simulation>>,
    in_flight: bool,
}

impl SimulationWorker {
    /// Move `simulation` onto a new worker thread.
    pub fn spawn(simulation: Simulation) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (mutation_tx, mutation_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("mech-simulation".into())
            .spawn(move || run(simulation, &command_rx, &mutation_rx, &report_tx))
            .map_err(|e| SimError::invariant(format!("failed to spawn worker: {e}")))?;

        Ok(Self {
            commands: Some(command_tx),
            mutations: mutation_tx,
            reports: report_rx,
            thread: Some(thread),
            in_flight: false,
        })
    }

    /// Queue a mutation for the start of the next tick.
    pub fn defer<F>(&self, mutation: F) -> Result<()>
    where
        F: FnOnce(&mut Simulation) + Send + 'static,
    {
        self.mutations
            .send(Box::new(mutation))
            .map_err(|_| SimError::WorkerDisconnected)
    }

    /// Whether a tick has been started and not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Start a tick of `dt` seconds without waiting for it.
    pub fn begin_tick(&mut self, dt: f64) -> Result<()> {
        if self.in_flight {
            return Err(SimError::invariant("a tick is already in flight"));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimestep(dt));
        }
        self.commands
            .as_ref()
            .ok_or(SimError::WorkerDisconnected)?
            .send(Command::Tick(dt))
            .map_err(|_| SimError::WorkerDisconnected)?;
        self.in_flight = true;
        Ok(())
    }

    /// Wait for the tick started by [`begin_tick`](Self::begin_tick).
    pub fn finish_tick(&mut self) -> Result<TickReport> {
        if !self.in_flight {
            return Err(SimError::invariant("no tick in flight"));
        }
        self.in_flight = false;
        self.reports
            .recv()
            .map_err(|_| SimError::WorkerDisconnected)?
    }

    /// Run one tick and wait for it.
    pub fn tick(&mut self, dt: f64) -> Result<TickReport> {
        self.begin_tick(dt)?;
        self.finish_tick()
    }

    /// Stop the worker and take the simulation back.
    ///
    /// A tick still in flight completes first; its report is discarded.
    pub fn shutdown(mut self) -> Result<Simulation> {
        self.stop().ok_or(SimError::WorkerDisconnected)
    }

    fn stop(&mut self) -> Option<Simulation> {
        self.commands.take();
        self.thread.take()?.join().ok()
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut simulation: Simulation,
    commands: &Receiver<Command>,
    mutations: &Receiver<Mutation>,
    reports: &Sender<Result<TickReport>>,
) -> Simulation {
    debug!("simulation worker started");
    while let Ok(Command::Tick(dt)) = commands.recv() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<TickReport> {
            let mut applied = 0;
            for mutation in mutations.try_iter() {
                mutation(&mut simulation);
                applied += 1;
            }
            let stats = simulation.tick(dt)?;
            Ok(TickReport {
                mutations: applied,
                stats,
                snapshot: simulation.snapshot(),
            })
        }));
        let report = outcome.unwrap_or_else(|payload| {
            let reason = panic_message(payload.as_ref());
            warn!(tick = simulation.tick_count(), %reason, "tick aborted");
            Err(SimError::TickAborted {
                tick: simulation.tick_count(),
                reason,
            })
        });
        if reports.send(report).is_err() {
            break;
        }
    }
    debug!("simulation worker stopped");
    simulation
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use mech_core::RigidBody;
    use mech_types::{PhysicsConfig, Pose2, SimulationConfig};

    fn worker() -> SimulationWorker {
        let config = SimulationConfig {
            physics: PhysicsConfig::fast(),
            ..SimulationConfig::default()
        };
        SimulationWorker::spawn(Simulation::new(config).unwrap()).unwrap()
    }

    #[test]
    fn test_handshake_reports_tick() {
        let mut worker = worker();
        worker.begin_tick(0.05).unwrap();
        assert!(worker.in_flight());
        let report = worker.finish_tick().unwrap();
        assert!(!worker.in_flight());
        assert_eq!(report.snapshot.tick, 1);
        assert_eq!(report.mutations, 0);
    }

    #[test]
    fn test_double_begin_rejected() {
        let mut worker = worker();
        worker.begin_tick(0.05).unwrap();
        assert!(worker.begin_tick(0.05).is_err());
        worker.finish_tick().unwrap();
        assert!(worker.finish_tick().is_err());
    }

    #[test]
    fn test_deferred_mutations_apply_at_tick_start() {
        let mut worker = worker();
        for x in [0.0, 1.0] {
            worker
                .defer(move |sim| {
                    sim.physics_mut()
                        .add_body(RigidBody::new(1.0, Pose2::from_xy(x, 0.0)).unwrap());
                })
                .unwrap();
        }
        let report = worker.tick(0.05).unwrap();
        assert_eq!(report.mutations, 2);
        assert_eq!(report.snapshot.bodies.len(), 2);

        let report = worker.tick(0.05).unwrap();
        assert_eq!(report.mutations, 0);
    }

    #[test]
    fn test_panic_aborts_tick_without_deadlock() {
        let mut worker = worker();
        worker.defer(|_| panic!("bad mutation")).unwrap();

        let err = worker.tick(0.05).unwrap_err();
        assert_eq!(
            err,
            SimError::TickAborted {
                tick: 0,
                reason: "bad mutation".to_string(),
            }
        );

        let report = worker.tick(0.05).unwrap();
        assert_eq!(report.snapshot.tick, 1);
    }

    #[test]
    fn test_invalid_timestep_rejected_before_send() {
        let mut worker = worker();
        assert!(matches!(worker.begin_tick(0.0), Err(SimError::InvalidTimestep(_))));
        assert!(!worker.in_flight());
    }

    #[test]
    fn test_shutdown_returns_simulation() {
        let mut worker = worker();
        worker.tick(0.05).unwrap();
        worker.tick(0.05).unwrap();
        let sim = worker.shutdown().unwrap();
        assert_eq!(sim.tick_count(), 2);
    }
}
