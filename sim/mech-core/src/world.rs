//! The physics world: registry, rebuild and the sub-step loop.
//!
//! # Tick
//!
//! ```text
//! tick(dt):
//!   if parameters changed: resize solver, re-solve rest poses
//!   force generators
//!   repeat `steps` times (h = dt / steps):
//!     for stage in 0..4:
//!       integrator.step(stage)     move to the stage state
//!       solver                     accelerations at that state
//!       integrator.solve(stage)    accumulate
//!     integrator.finish()
//!   step handlers
//! ```

use std::fmt;

use mech_constraint::{
    synthesize, Attachment, Constraint, ConstraintSolver, RestPoses, RestSolution, SolveReport,
    DOF_PER_BODY,
};
use mech_types::{
    Arena, BodyHandle, ConstraintHandle, Direction, HookHandle, OwnerHandle, PhysicsConfig,
    Result, SimError, Vector2,
};
use nalgebra::DVector;
use tracing::{debug, trace, warn};

use crate::body::{Bodies, RigidBody};
use crate::hooks::{ForceGenerator, StepHandler};
use crate::integrator::{Rk4Integrator, STAGES};
use crate::owner::{ConnectionPoint, OwnerCapabilities, RegisteredOwner};

/// Diagnostics of the most recent tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickStats {
    /// Sub-steps run.
    pub substeps: usize,
    /// Dynamic constraint solves (four per sub-step).
    pub solves: usize,
    /// Largest CG iteration count of any solve.
    pub max_iterations: usize,
    /// Solves that hit the iteration cap.
    pub unconverged_solves: usize,
    /// Rest-pose solve, when the tick started with a rebuild.
    pub rest: Option<RestSolution>,
}

impl TickStats {
    fn record(&mut self, report: &SolveReport) {
        self.solves += 1;
        self.max_iterations = self.max_iterations.max(report.iterations);
        if !report.converged {
            self.unconverged_solves += 1;
        }
    }
}

/// A world of planar rigid bodies joined by constraints.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: Bodies,
    constraints: Arena<Box<dyn Constraint>>,
    force_generators: Arena<Box<dyn ForceGenerator>>,
    step_handlers: Arena<Box<dyn StepHandler>>,
    owners: Arena<RegisteredOwner>,
    solver: ConstraintSolver,
    integrator: Rk4Integrator,
    row_count: usize,
    parameters_changed: bool,
    time: f64,
    tick_count: u64,
    last_stats: TickStats,
    velocities: DVector<f64>,
    forces: DVector<f64>,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("rows", &self.row_count)
            .field("force_generators", &self.force_generators.len())
            .field("step_handlers", &self.step_handlers.len())
            .field("owners", &self.owners.len())
            .field("parameters_changed", &self.parameters_changed)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::build(PhysicsConfig::default())
    }
}

impl PhysicsWorld {
    /// Create an empty world.
    pub fn new(config: PhysicsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PhysicsConfig) -> Self {
        let solver = ConstraintSolver::new(config.solver, config.baumgarte);
        Self {
            config,
            bodies: Bodies::new(),
            constraints: Arena::new(),
            force_generators: Arena::new(),
            step_handlers: Arena::new(),
            owners: Arena::new(),
            solver,
            integrator: Rk4Integrator::new(),
            row_count: 0,
            parameters_changed: true,
            time: 0.0,
            tick_count: 0,
            last_stats: TickStats::default(),
            velocities: DVector::zeros(0),
            forces: DVector::zeros(0),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// World configuration.
    #[must_use]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Simulated time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Completed ticks.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The body registry.
    #[must_use]
    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    /// Body by handle.
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Mutable body by handle.
    ///
    /// Mass changes must go through [`set_mass`](Self::set_mass).
    #[must_use]
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Number of live bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of constraints.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Constraint by handle.
    #[must_use]
    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&dyn Constraint> {
        self.constraints.get(handle.raw()).map(|c| &**c)
    }

    /// Total scalar constraint rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Whether the next tick starts with a rebuild.
    #[must_use]
    pub fn parameters_changed(&self) -> bool {
        self.parameters_changed
    }

    /// The constraint solver.
    #[must_use]
    pub fn solver(&self) -> &ConstraintSolver {
        &self.solver
    }

    /// Diagnostics of the last tick.
    #[must_use]
    pub fn last_tick_stats(&self) -> &TickStats {
        &self.last_stats
    }

    /// Total kinetic energy of all bodies.
    #[must_use]
    pub fn total_kinetic_energy(&self) -> f64 {
        self.bodies.total_kinetic_energy()
    }

    // ------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------

    /// Register a body. Its slot may be one freed by an earlier removal.
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        let handle = self.bodies.insert(body);
        self.parameters_changed = true;
        debug!(%handle, "body added");
        handle
    }

    /// Remove a body and every constraint that references it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let body = self.bodies.remove(handle)?;
        let dependent: Vec<ConstraintHandle> = self
            .constraints
            .iter()
            .filter(|(_, c)| c.references(handle))
            .map(|(h, _)| ConstraintHandle::new(h))
            .collect();
        for constraint in &dependent {
            self.detach_constraint(*constraint);
        }
        self.parameters_changed = true;
        debug!(%handle, cascaded = dependent.len(), "body removed");
        Ok(body)
    }

    /// Change a body's mass.
    ///
    /// When no rebuild is pending the solver's inverse mass is patched in
    /// place; otherwise the rebuild picks it up.
    pub fn set_mass(&mut self, handle: BodyHandle, mass: f64) -> Result<()> {
        self.bodies.try_get_mut(handle)?.set_mass(mass)?;
        if !self.parameters_changed {
            self.solver.update_mass(handle.index(), Some(mass))?;
        }
        Ok(())
    }

    /// Set a body's external force and torque. They stay set until changed.
    pub fn set_external_force(
        &mut self,
        handle: BodyHandle,
        force: Vector2<f64>,
        torque: f64,
    ) -> Result<()> {
        self.bodies.set_external(handle, force, torque)
    }

    // ------------------------------------------------------------------
    // Constraints
    // ------------------------------------------------------------------

    /// Register a constraint. Every body it references must be live.
    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) -> Result<ConstraintHandle> {
        for body in constraint.bodies().into_iter().flatten() {
            if !self.bodies.contains(body) {
                return Err(body.stale());
            }
        }
        self.row_count += constraint.internal_constraint_count();
        let handle = ConstraintHandle::new(self.constraints.insert(constraint));
        self.parameters_changed = true;
        debug!(%handle, rows = self.row_count, "constraint added");
        Ok(handle)
    }

    /// Remove a constraint.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<Box<dyn Constraint>> {
        self.detach_constraint(handle).ok_or_else(|| handle.stale())
    }

    fn detach_constraint(&mut self, handle: ConstraintHandle) -> Option<Box<dyn Constraint>> {
        let constraint = self.constraints.remove(handle.raw())?;
        self.row_count -= constraint.internal_constraint_count();
        self.parameters_changed = true;
        Some(constraint)
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Register a force generator.
    pub fn add_force_generator(&mut self, generator: Box<dyn ForceGenerator>) -> HookHandle {
        HookHandle::new(self.force_generators.insert(generator))
    }

    /// Remove a force generator.
    pub fn remove_force_generator(&mut self, handle: HookHandle) -> Result<Box<dyn ForceGenerator>> {
        self.force_generators
            .remove(handle.raw())
            .ok_or_else(|| handle.stale())
    }

    /// Register a step handler.
    pub fn add_step_handler(&mut self, handler: Box<dyn StepHandler>) -> HookHandle {
        HookHandle::new(self.step_handlers.insert(handler))
    }

    /// Remove a step handler.
    pub fn remove_step_handler(&mut self, handle: HookHandle) -> Result<Box<dyn StepHandler>> {
        self.step_handlers
            .remove(handle.raw())
            .ok_or_else(|| handle.stale())
    }

    // ------------------------------------------------------------------
    // Owners
    // ------------------------------------------------------------------

    /// Register everything an owner contributes.
    ///
    /// Bodies are added first; the internal constraint, force generator and
    /// step handler builders then receive the assigned body handles.
    pub fn register_owner(&mut self, capabilities: OwnerCapabilities) -> Result<OwnerHandle> {
        let OwnerCapabilities {
            bodies,
            internal_constraints,
            force_generator,
            step_handler,
            connections,
        } = capabilities;

        let mut owner = RegisteredOwner {
            connections,
            ..RegisteredOwner::default()
        };
        for body in bodies {
            owner.bodies.push(self.add_body(body));
        }

        if let Some(build) = internal_constraints {
            for constraint in build(&owner.bodies) {
                match self.add_constraint(constraint) {
                    Ok(handle) => owner.constraints.push(handle),
                    Err(err) => {
                        self.unregister(&owner);
                        return Err(err);
                    }
                }
            }
        }
        if let Some(build) = force_generator {
            owner.force_generator = Some(self.add_force_generator(build(&owner.bodies)));
        }
        if let Some(build) = step_handler {
            owner.step_handler = Some(self.add_step_handler(build(&owner.bodies)));
        }

        let handle = OwnerHandle::new(self.owners.insert(owner));
        debug!(%handle, "owner registered");
        Ok(handle)
    }

    /// Remove everything an owner registered, including its links to
    /// neighbours.
    pub fn deregister_owner(&mut self, handle: OwnerHandle) -> Result<RegisteredOwner> {
        let owner = self
            .owners
            .remove(handle.raw())
            .ok_or_else(|| handle.stale())?;
        self.unregister(&owner);
        debug!(%handle, "owner deregistered");
        Ok(owner)
    }

    fn unregister(&mut self, owner: &RegisteredOwner) {
        if let Some(hook) = owner.force_generator {
            self.force_generators.remove(hook.raw());
        }
        if let Some(hook) = owner.step_handler {
            self.step_handlers.remove(hook.raw());
        }
        for constraint in owner.constraints.iter().chain(&owner.links) {
            self.detach_constraint(*constraint);
        }
        for body in &owner.bodies {
            // Cascades to links owned by neighbours.
            if let Err(err) = self.remove_body(*body) {
                warn!(%body, %err, "owner body was already removed");
            }
        }
        for (_, other) in self.owners.iter_mut() {
            other
                .links
                .retain(|link| self.constraints.contains(link.raw()));
        }
    }

    /// Registered owner by handle.
    #[must_use]
    pub fn owner(&self, handle: OwnerHandle) -> Option<&RegisteredOwner> {
        self.owners.get(handle.raw())
    }

    /// Join two adjacent owners. `towards_b` is the side of `a` that faces
    /// `b`; `b` connects through the opposite side.
    ///
    /// Returns `Ok(None)` when the facing connection types do not connect.
    pub fn connect_owners(
        &mut self,
        a: OwnerHandle,
        b: OwnerHandle,
        towards_b: Direction,
    ) -> Result<Option<ConstraintHandle>> {
        let first = self.owners.try_get(a.raw())?.connection(towards_b)?;
        let second = self
            .owners
            .try_get(b.raw())?
            .connection(towards_b.opposite())?;
        let (Some((pa, body_a)), Some((pb, body_b))) = (first, second) else {
            return Ok(None);
        };

        let attach = |point: ConnectionPoint, body| Attachment {
            kind: point.kind,
            body,
            anchor: point.anchor,
            angle_offset: point.angle_offset,
        };
        let Some(constraint) = synthesize(&attach(pa, body_a), &attach(pb, body_b)) else {
            debug!(%a, %b, ?towards_b, "connection types do not connect");
            return Ok(None);
        };

        let handle = self.add_constraint(constraint)?;
        for owner in [a, b] {
            if let Some(owner) = self.owners.get_mut(owner.raw()) {
                owner.links.push(handle);
            }
        }
        debug!(%a, %b, %handle, "owners connected");
        Ok(Some(handle))
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Resize the solver for the current topology and re-solve rest poses.
    ///
    /// Runs automatically at the start of a tick after any add or remove.
    pub fn rebuild(&mut self) -> Result<RestSolution> {
        let slots = self.bodies.slot_count();
        self.solver.resize(slots, self.row_count);
        for (handle, body) in self.bodies.iter() {
            self.solver.update_mass(handle.index(), Some(body.mass()))?;
        }
        let columns = slots * DOF_PER_BODY;
        self.velocities = DVector::zeros(columns);
        self.forces = DVector::zeros(columns);

        let mut poses = RestPoses::new(slots);
        for (handle, body) in self.bodies.iter() {
            poses.insert(handle, body.rest_pose().unwrap_or_else(|| body.state().pose()));
        }
        let constraints: Vec<&dyn Constraint> =
            self.constraints.iter().map(|(_, c)| c.as_ref()).collect();
        let rest = self.solver.solve_rest(&constraints, &mut poses)?;

        for (handle, pose) in poses.iter() {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.set_rest_position(pose);
            }
        }
        self.parameters_changed = false;
        debug!(
            bodies = self.bodies.len(),
            rows = self.row_count,
            passes = rest.passes,
            "physics world rebuilt"
        );
        Ok(rest)
    }

    /// Largest constraint error at the current state.
    pub fn max_constraint_error(&mut self) -> Result<f64> {
        if self.parameters_changed {
            self.rebuild()?;
        }
        let constraints: Vec<&dyn Constraint> =
            self.constraints.iter().map(|(_, c)| c.as_ref()).collect();
        self.solver.max_error(&constraints, &self.bodies)
    }

    /// Advance the world by `dt`.
    pub fn tick(&mut self, dt: f64) -> Result<TickStats> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimestep(dt));
        }
        let mut stats = TickStats::default();
        if self.parameters_changed {
            stats.rest = Some(self.rebuild()?);
        }

        for (_, generator) in self.force_generators.iter_mut() {
            generator.apply(dt, &mut self.bodies)?;
        }

        let steps = self.config.steps;
        #[allow(clippy::cast_precision_loss)]
        let h = dt / steps as f64;
        for _ in 0..steps {
            for stage in 0..STAGES {
                self.integrator.step(stage, h, &mut self.bodies);
                let report = self.evaluate()?;
                stats.record(&report);
                self.integrator.solve(stage, h, &self.bodies);
            }
            self.integrator.finish(&mut self.bodies);
            stats.substeps += 1;
        }

        if let Some((handle, _)) = self.bodies.iter().find(|(_, b)| !b.state().is_finite()) {
            return Err(SimError::diverged(format!("{handle} state is not finite")));
        }

        for (_, handler) in self.step_handlers.iter_mut() {
            handler.on_step_end(dt, &self.bodies);
        }

        self.time += dt;
        self.tick_count += 1;
        self.last_stats = stats;
        trace!(
            tick = self.tick_count,
            solves = stats.solves,
            max_iterations = stats.max_iterations,
            "physics tick"
        );
        Ok(stats)
    }

    /// Solve for accelerations at the bodies' current state.
    fn evaluate(&mut self) -> Result<SolveReport> {
        self.velocities.fill(0.0);
        self.forces.fill(0.0);
        for (handle, body) in self.bodies.iter() {
            let column = handle.index() * DOF_PER_BODY;
            let state = body.state();
            self.velocities[column] = state.velocity.x;
            self.velocities[column + 1] = state.velocity.y;
            self.velocities[column + 2] = state.angular_velocity;
            self.forces[column] = state.force.x;
            self.forces[column + 1] = state.force.y;
            self.forces[column + 2] = state.torque;
        }

        let constraints: Vec<&dyn Constraint> =
            self.constraints.iter().map(|(_, c)| c.as_ref()).collect();
        let report = self.solver.solve_dynamics(
            &constraints,
            &self.bodies,
            &self.velocities,
            &self.forces,
        )?;

        let accelerations = self.solver.accelerations();
        let constraint_forces = self.solver.constraint_forces();
        for (handle, body) in self.bodies.iter_mut() {
            let column = handle.index() * DOF_PER_BODY;
            let state = body.state_mut();
            state.acceleration = Vector2::new(accelerations[column], accelerations[column + 1]);
            state.angular_acceleration = accelerations[column + 2];
            state.constraint_force =
                Vector2::new(constraint_forces[column], constraint_forces[column + 1]);
            state.constraint_torque = constraint_forces[column + 2];
        }
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mech_constraint::{PositionConstraint, RotationConstraint};
    use mech_types::{ConnectionType, Pose2};

    fn body(mass: f64, x: f64, y: f64) -> RigidBody {
        RigidBody::new(mass, Pose2::from_xy(x, y)).unwrap()
    }

    fn fast_world() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsConfig::default().with_steps(10)).unwrap()
    }

    #[test]
    fn test_free_body_under_constant_force() {
        let mut world = fast_world();
        let h = world.add_body(body(2.0, 0.0, 0.0));
        world.set_external_force(h, Vector2::new(4.0, 0.0), 0.0).unwrap();

        let stats = world.tick(1.0).unwrap();
        assert_eq!(stats.substeps, 10);
        assert_eq!(stats.solves, 40);

        let state = world.body(h).unwrap().state();
        assert_relative_eq!(state.velocity.x, 2.0, epsilon = 1e-10);
        assert_relative_eq!(state.position.x, 1.0, epsilon = 1e-10);
        assert_relative_eq!(world.time(), 1.0);
    }

    #[test]
    fn test_add_remove_sets_parameters_changed() {
        let mut world = fast_world();
        let a = world.add_body(body(1.0, 0.0, 0.0));
        assert!(world.parameters_changed());
        world.tick(0.01).unwrap();
        assert!(!world.parameters_changed());

        let c = world
            .add_constraint(Box::new(PositionConstraint::new(a, Vector2::zeros())))
            .unwrap();
        assert_eq!(world.row_count(), 2);
        assert!(world.parameters_changed());
        world.tick(0.01).unwrap();

        world.remove_constraint(c).unwrap();
        assert_eq!(world.row_count(), 0);
        assert!(world.parameters_changed());
        assert!(world.remove_constraint(c).unwrap_err().is_stale_handle());
    }

    #[test]
    fn test_remove_body_cascades_constraints() {
        let mut world = fast_world();
        let a = world.add_body(body(1.0, 0.0, 0.0));
        let b = world.add_body(body(1.0, 1.0, 0.0));
        world
            .add_constraint(Box::new(RotationConstraint::new(a, b)))
            .unwrap();
        world
            .add_constraint(Box::new(PositionConstraint::new(a, Vector2::zeros())))
            .unwrap();

        world.remove_body(b).unwrap();
        assert_eq!(world.constraint_count(), 1);
        assert_eq!(world.row_count(), 2);
        world.tick(0.01).unwrap();
    }

    #[test]
    fn test_constraint_on_stale_body_rejected() {
        let mut world = fast_world();
        let a = world.add_body(body(1.0, 0.0, 0.0));
        world.remove_body(a).unwrap();
        let err = world
            .add_constraint(Box::new(PositionConstraint::new(a, Vector2::zeros())))
            .unwrap_err();
        assert!(err.is_stale_handle());
    }

    #[test]
    fn test_set_mass_fast_path() {
        let mut world = fast_world();
        let a = world.add_body(body(1.0, 0.0, 0.0));
        world.tick(0.01).unwrap();

        world.set_mass(a, 4.0).unwrap();
        assert!(!world.parameters_changed());
        assert_eq!(world.solver().inverse_mass()[0], 0.25);
        assert!(world.set_mass(a, -1.0).is_err());
    }

    #[test]
    fn test_invalid_timestep() {
        let mut world = fast_world();
        assert!(matches!(world.tick(0.0), Err(SimError::InvalidTimestep(_))));
        assert!(world.tick(f64::NAN).is_err());
    }

    #[test]
    fn test_rest_solve_reseeds_live_pose() {
        let mut world = fast_world();
        let a = world.add_body(body(1.0, 3.0, 3.0));
        world
            .add_constraint(Box::new(PositionConstraint::new(a, Vector2::new(1.0, 2.0))))
            .unwrap();
        let rest = world.rebuild().unwrap();
        assert!(rest.converged);

        let body = world.body(a).unwrap();
        assert_eq!(body.rest_pose().unwrap().position, Vector2::new(1.0, 2.0));
        assert_eq!(body.state().position, Vector2::new(1.0, 2.0));
        assert_eq!(world.max_constraint_error().unwrap(), 0.0);
    }

    #[test]
    fn test_force_generator_and_step_handler_run_once_per_tick() {
        use crate::hooks::EnergyMeter;

        let mut world = fast_world();
        let a = world.add_body(body(1.0, 0.0, 0.0));
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        world.add_force_generator(Box::new(move |_dt: f64, bodies: &mut Bodies| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            bodies.set_external(a, Vector2::new(1.0, 0.0), 0.0)
        }));
        let meter = EnergyMeter::new();
        world.add_step_handler(Box::new(meter.clone()));

        world.tick(0.1).unwrap();
        world.tick(0.1).unwrap();

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        let readings = meter.readings();
        assert_eq!(readings.len(), 2);
        assert!(readings[1].kinetic_energy > readings[0].kinetic_energy);
        assert_relative_eq!(
            readings[1].kinetic_energy,
            world.total_kinetic_energy(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_deregister_owner_after_direct_body_removal() {
        let mut world = fast_world();
        let owner = world
            .register_owner(
                OwnerCapabilities::new()
                    .with_body(body(1.0, 0.0, 0.0))
                    .with_body(body(1.0, 1.0, 0.0))
                    .with_internal_constraints(|bodies| {
                        vec![Box::new(RotationConstraint::new(bodies[0], bodies[1]))
                            as Box<dyn Constraint>]
                    }),
            )
            .unwrap();
        let bodies = world.owner(owner).unwrap().bodies.clone();
        world.remove_body(bodies[0]).unwrap();
        assert_eq!(world.constraint_count(), 0);

        let removed = world.deregister_owner(owner).unwrap();
        assert_eq!(removed.bodies, bodies);
        assert!(world.owner(owner).is_none());
        assert_eq!(world.body_count(), 0);
        assert!(world.body(bodies[1]).is_none());
        assert_eq!(world.row_count(), 0);
        world.tick(0.01).unwrap();
    }

    #[test]
    fn test_owner_registration_and_connection() {
        let mut world = fast_world();
        let left = world
            .register_owner(
                OwnerCapabilities::new()
                    .with_body(body(1.0, 0.0, 0.0))
                    .with_internal_constraints(|bodies| {
                        vec![Box::new(PositionConstraint::new(bodies[0], Vector2::zeros()))
                            as Box<dyn Constraint>]
                    })
                    .with_connection(
                        Direction::East,
                        ConnectionPoint::new(ConnectionType::Rotational, 0),
                    ),
            )
            .unwrap();
        let right = world
            .register_owner(
                OwnerCapabilities::new()
                    .with_body(body(1.0, 1.0, 0.0))
                    .with_connection(
                        Direction::West,
                        ConnectionPoint::new(ConnectionType::Rotational, 0),
                    ),
            )
            .unwrap();

        let link = world.connect_owners(left, right, Direction::East).unwrap();
        assert!(link.is_some());
        assert_eq!(world.row_count(), 3);
        assert!(world.connect_owners(left, right, Direction::Up).unwrap().is_none());

        world.tick(0.01).unwrap();
        world.deregister_owner(right).unwrap();
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.constraint_count(), 1);
        assert!(world.owner(left).unwrap().links.is_empty());
        world.tick(0.01).unwrap();
    }
}
