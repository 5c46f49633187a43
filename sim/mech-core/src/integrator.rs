//! Classical fourth-order Runge-Kutta, evaluated stage by stage.
//!
//! Accelerations depend on the constraint solve, which needs the state of
//! every body at once, so the scheme is split into three calls per stage:
//!
//! ```text
//! step(s)   state = initial + c_s·h·(previous derivative)    c = [0, ½, ½, 1]
//! (solver)  accelerations at the stage state
//! solve(s)  accumulated += w_s·h·(stage derivative)          w = [⅙, ⅓, ⅓, ⅙]
//! ```
//!
//! After the fourth stage [`finish`](Rk4Integrator::finish) replaces the
//! state with the accumulated one.

use std::f64::consts::TAU;

use mech_types::Vector2;

use crate::body::Bodies;

/// Stage count of the scheme.
pub const STAGES: usize = 4;

const STAGE_OFFSET: [f64; STAGES] = [0.0, 0.5, 0.5, 1.0];
const STAGE_WEIGHT: [f64; STAGES] = [1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0];

#[derive(Debug, Clone, Copy, Default)]
struct Snapshot {
    position: Vector2<f64>,
    angle: f64,
    velocity: Vector2<f64>,
    angular_velocity: f64,
}

/// Incremental RK4 over every body of a world.
#[derive(Debug, Clone, Default)]
pub struct Rk4Integrator {
    initial: Vec<Option<Snapshot>>,
    accumulated: Vec<Option<Snapshot>>,
}

impl Rk4Integrator {
    /// Create an integrator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&mut self, bodies: &Bodies) {
        let slots = bodies.slot_count();
        self.initial.clear();
        self.initial.resize(slots, None);
        for (handle, body) in bodies.iter() {
            let state = body.state();
            self.initial[handle.index()] = Some(Snapshot {
                position: state.position,
                angle: state.angle,
                velocity: state.velocity,
                angular_velocity: state.angular_velocity,
            });
        }
        self.accumulated.clone_from(&self.initial);
    }

    /// Move every body to the evaluation point of `stage`.
    ///
    /// Stage 0 snapshots the current state. Later stages start from that
    /// snapshot and advance by the derivative of the previous stage, which
    /// is still held in each body's velocity and acceleration.
    pub fn step(&mut self, stage: usize, h: f64, bodies: &mut Bodies) {
        if stage == 0 {
            self.begin(bodies);
            return;
        }
        let c = STAGE_OFFSET[stage] * h;
        for (handle, body) in bodies.iter_mut() {
            let Some(Some(initial)) = self.initial.get(handle.index()) else {
                continue;
            };
            let state = body.state_mut();
            let velocity = state.velocity;
            let angular_velocity = state.angular_velocity;
            state.position = initial.position + velocity * c;
            state.angle = initial.angle + angular_velocity * c;
            state.velocity = initial.velocity + state.acceleration * c;
            state.angular_velocity = initial.angular_velocity + state.angular_acceleration * c;
        }
    }

    /// Add the derivative at the current stage state to the accumulator.
    pub fn solve(&mut self, stage: usize, h: f64, bodies: &Bodies) {
        let w = STAGE_WEIGHT[stage] * h;
        for (handle, body) in bodies.iter() {
            let Some(Some(acc)) = self.accumulated.get_mut(handle.index()) else {
                continue;
            };
            let state = body.state();
            acc.position += state.velocity * w;
            acc.angle += state.angular_velocity * w;
            acc.velocity += state.acceleration * w;
            acc.angular_velocity += state.angular_acceleration * w;
        }
    }

    /// Commit the accumulated state. Angles are wrapped into `(−2π, 2π)`.
    pub fn finish(&mut self, bodies: &mut Bodies) {
        for (handle, body) in bodies.iter_mut() {
            let Some(Some(acc)) = self.accumulated.get(handle.index()) else {
                continue;
            };
            let state = body.state_mut();
            state.position = acc.position;
            state.angle = acc.angle % TAU;
            state.velocity = acc.velocity;
            state.angular_velocity = acc.angular_velocity;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::RigidBody;
    use approx::assert_relative_eq;
    use mech_types::Pose2;

    /// Drive one sub-step with a position-dependent acceleration `a = k(x)`.
    fn substep(bodies: &mut Bodies, h: f64, accel: impl Fn(f64) -> f64) {
        let mut rk = Rk4Integrator::new();
        for stage in 0..STAGES {
            rk.step(stage, h, bodies);
            for (_, body) in bodies.iter_mut() {
                let x = body.state().position.x;
                body.state_mut().acceleration.x = accel(x);
            }
            rk.solve(stage, h, bodies);
        }
        rk.finish(bodies);
    }

    #[test]
    fn test_constant_acceleration_is_exact() {
        let mut bodies = Bodies::new();
        let h = bodies.insert(RigidBody::new(1.0, Pose2::default()).unwrap());
        substep(&mut bodies, 0.5, |_| 2.0);

        let state = bodies.get(h).unwrap().state();
        assert_relative_eq!(state.velocity.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(state.position.x, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_harmonic_oscillator_fourth_order() {
        let mut bodies = Bodies::new();
        let h = bodies.insert(RigidBody::new(1.0, Pose2::from_xy(1.0, 0.0)).unwrap());
        let dt = 0.01;
        let steps = 100;
        for _ in 0..steps {
            substep(&mut bodies, dt, |x| -x);
        }
        let state = bodies.get(h).unwrap().state();
        let t = dt * f64::from(steps);
        assert_relative_eq!(state.position.x, t.cos(), epsilon = 1e-8);
        assert_relative_eq!(state.velocity.x, -t.sin(), epsilon = 1e-8);
    }

    #[test]
    fn test_angle_wrapped() {
        let mut bodies = Bodies::new();
        let h = bodies.insert(RigidBody::new(1.0, Pose2::new(Vector2::zeros(), 6.2)).unwrap());
        bodies.get_mut(h).unwrap().state_mut().angular_velocity = 1.0;
        substep(&mut bodies, 0.5, |_| 0.0);

        let angle = bodies.get(h).unwrap().state().angle;
        assert_relative_eq!(angle, 6.7 - TAU, epsilon = 1e-12);
    }
}
