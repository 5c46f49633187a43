//! Per-tick hooks: force generators and step handlers.
//!
//! Force generators run once before the sub-step loop of a tick and set the
//! external force and torque of the bodies they drive. The force stays set
//! until a generator changes it. Step handlers run once after the loop and
//! observe the final state.

use std::sync::{Arc, Mutex, MutexGuard};

use mech_types::Result;

use crate::body::Bodies;

/// Sets external forces before each tick.
pub trait ForceGenerator: Send {
    /// Apply forces for a tick of length `dt`.
    fn apply(&mut self, dt: f64, bodies: &mut Bodies) -> Result<()>;
}

impl<F> ForceGenerator for F
where
    F: FnMut(f64, &mut Bodies) -> Result<()> + Send,
{
    fn apply(&mut self, dt: f64, bodies: &mut Bodies) -> Result<()> {
        self(dt, bodies)
    }
}

/// Observes the world after each tick.
pub trait StepHandler: Send {
    /// Called once the tick's sub-steps have completed.
    fn on_step_end(&mut self, dt: f64, bodies: &Bodies);
}

/// Records the total kinetic energy of the world after every tick.
///
/// Clones share the same record, so a clone kept outside the world can read
/// what the registered meter wrote.
#[derive(Debug, Clone, Default)]
pub struct EnergyMeter {
    readings: Arc<Mutex<Vec<EnergyReading>>>,
}

/// One energy sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyReading {
    /// Length of the tick that produced the sample.
    pub dt: f64,
    /// Total kinetic energy after the tick.
    pub kinetic_energy: f64,
}

impl EnergyMeter {
    /// Create an empty meter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EnergyReading>> {
        self.readings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// All samples recorded so far.
    #[must_use]
    pub fn readings(&self) -> Vec<EnergyReading> {
        self.lock().clone()
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<EnergyReading> {
        self.lock().last().copied()
    }

    /// Forget all samples.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl StepHandler for EnergyMeter {
    fn on_step_end(&mut self, dt: f64, bodies: &Bodies) {
        let kinetic_energy = bodies.total_kinetic_energy();
        self.lock().push(EnergyReading { dt, kinetic_energy });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::RigidBody;
    use mech_types::{Pose2, Vector2};

    #[test]
    fn test_closure_force_generator() {
        let mut bodies = Bodies::new();
        let h = bodies.insert(RigidBody::new(1.0, Pose2::default()).unwrap());
        let mut generator = move |_dt: f64, bodies: &mut Bodies| {
            bodies.set_external(h, Vector2::new(1.0, 0.0), 0.5)
        };
        generator.apply(0.1, &mut bodies).unwrap();
        assert_eq!(bodies.get(h).unwrap().state().torque, 0.5);
    }

    #[test]
    fn test_energy_meter_shares_readings() {
        let mut bodies = Bodies::new();
        let h = bodies.insert(RigidBody::new(2.0, Pose2::default()).unwrap());
        bodies.get_mut(h).unwrap().state_mut().velocity = Vector2::new(1.0, 0.0);

        let observer = EnergyMeter::new();
        let mut registered = observer.clone();
        registered.on_step_end(0.05, &bodies);

        assert_eq!(observer.readings().len(), 1);
        assert_eq!(observer.latest().unwrap().kinetic_energy, 1.0);
        observer.clear();
        assert!(registered.latest().is_none());
    }
}
