//! Gas network behaviour through the public API.
//!
//! Conservation properties are checked over random networks with proptest.
//!
//! Run with: cargo test -p mech-physics --test gas_transport

use approx::assert_relative_eq;
use mech_gas::flow::{CHOKED_FLOW_LIMIT, CHOKED_FLOW_RATIO, GAMMA, GAS_CONSTANT};
use mech_physics::prelude::*;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// A cell with random volume, content, temperature and momentum.
fn arb_cell() -> impl Strategy<Value = GasCell> {
    (
        0.1..10.0f64,
        0.0..100.0f64,
        50.0..1000.0f64,
        prop::array::uniform3(-5.0..5.0f64),
    )
        .prop_map(|(volume, moles, temperature, [px, py, pz])| {
            GasCell::new(volume)
                .expect("positive volume")
                .with_gas(moles, temperature)
                .with_momentum(Vector3::new(px, py, pz))
        })
}

/// A chain of cells joined east to west, with per-port flow constants.
fn arb_chain() -> impl Strategy<Value = (Vec<GasCell>, Vec<f64>)> {
    (2usize..6).prop_flat_map(|n| {
        (
            prop::collection::vec(arb_cell(), n),
            prop::collection::vec(0.0..=1.0f64, n - 1),
        )
    })
}

fn build_chain(cells: Vec<GasCell>, constants: &[f64]) -> (GasNetwork, Vec<CellHandle>) {
    let mut net = GasNetwork::new(GasConfig::default()).expect("valid config");
    let handles: Vec<CellHandle> = cells.into_iter().map(|c| net.add_cell(c)).collect();
    for (pair, k) in handles.windows(2).zip(constants) {
        net.connect(
            GasPort::new(pair[0]).with_flow_constant(*k),
            GasPort::new(pair[1]),
            Direction::East,
        )
        .expect("free ports");
    }
    (net, handles)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn transfers_conserve_moles_and_momentum(
        (cells, constants) in arb_chain(),
        steps in 1usize..20,
        dt in 1e-5..1e-2f64,
    ) {
        let (mut net, _) = build_chain(cells, &constants);
        let moles = net.total_moles();
        let momentum = net.total_momentum();

        for _ in 0..steps {
            net.simulate(dt).expect("valid step");
        }

        prop_assert!((net.total_moles() - moles).abs() <= 1e-9 * moles.max(1.0));
        prop_assert!((net.total_momentum() - momentum).norm() <= 1e-9 * momentum.norm().max(1.0));
    }

    #[test]
    fn cells_never_go_negative(
        (cells, constants) in arb_chain(),
        dt in 1e-4..1.0f64,
    ) {
        let (mut net, handles) = build_chain(cells, &constants);
        for _ in 0..5 {
            net.simulate(dt).expect("valid step");
        }
        for handle in handles {
            let cell = net.cell(handle).expect("live cell");
            prop_assert!(cell.moles() >= 0.0);
            prop_assert!(cell.energy() >= 0.0);
            prop_assert!(cell.pressure().is_finite());
        }
    }
}

// =============================================================================
// Closed forms
// =============================================================================

fn one_step(source: GasCell, sink: GasCell, dt: f64) -> (f64, f64, f64) {
    let (p0, p1, t0) = (source.pressure(), sink.pressure(), source.temperature());
    let mut net = GasNetwork::new(GasConfig::default()).expect("valid config");
    let a = net.add_cell(source);
    let b = net.add_cell(sink);
    net.connect(GasPort::new(a), GasPort::new(b), Direction::East)
        .expect("free ports");
    let before = net.cell(b).expect("live cell").moles();
    net.simulate(dt).expect("valid step");
    let moved = net.cell(b).expect("live cell").moles() - before;
    (moved, p1 / p0, CHOKED_FLOW_RATIO * p0 / (GAS_CONSTANT * t0).sqrt() * dt)
}

#[test]
fn choked_flow_rate() {
    let (moved, ratio, choked) = one_step(
        GasCell::new(1.0).expect("valid").with_gas(100.0, 300.0),
        GasCell::new(1.0).expect("valid").with_gas(10.0, 300.0),
        1e-6,
    );
    assert!(ratio < CHOKED_FLOW_LIMIT);
    assert_relative_eq!(moved, choked, max_relative = 1e-9);
}

#[test]
fn subsonic_flow_rate() {
    let (moved, ratio, _) = one_step(
        GasCell::new(1.0).expect("valid").with_gas(100.0, 300.0),
        GasCell::new(1.0).expect("valid").with_gas(80.0, 300.0),
        1e-6,
    );
    assert!(ratio > CHOKED_FLOW_LIMIT);

    let p0 = 100.0 * GAS_CONSTANT * 300.0;
    let shape = 2.0 * GAMMA / (GAMMA - 1.0)
        * (ratio.powf(2.0 / GAMMA) - ratio.powf((GAMMA + 1.0) / GAMMA));
    let expected = shape.sqrt() * p0 / (GAS_CONSTANT * 300.0).sqrt() * 1e-6;
    assert_relative_eq!(moved, expected, max_relative = 1e-9);
}

#[test]
fn providers_connect_on_facing_sides() {
    struct Chamber {
        port: GasPort,
        side: Direction,
    }

    impl GasCellProvider for Chamber {
        fn gas_port(&self, side: Direction) -> Option<GasPort> {
            (side == self.side).then_some(self.port)
        }
    }

    let mut net = GasNetwork::new(GasConfig::default()).expect("valid config");
    let lower = Chamber {
        port: GasPort::new(net.add_cell(GasCell::new(1.0).expect("valid").with_gas(5.0, 300.0))),
        side: Direction::Up,
    };
    let upper = Chamber {
        port: GasPort::new(net.add_cell(GasCell::new(1.0).expect("valid"))),
        side: Direction::Down,
    };

    let boundary = net
        .connect_providers(&lower, &upper, Direction::Up)
        .expect("connect succeeds")
        .expect("facing ports");
    assert_eq!(net.boundary_at(upper.port.cell, Direction::Down).expect("port"), boundary);
    assert!(net
        .connect_providers(&lower, &upper, Direction::East)
        .expect("no error")
        .is_none());

    let stats = net.simulate(0.01).expect("valid step");
    assert_eq!(stats.transferred, 1);
    assert!(net.cell(upper.port.cell).expect("live cell").moles() > 0.0);
}
