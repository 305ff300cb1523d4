//! End-to-end runs of the engine on the default floor.

use std::collections::HashSet;

use robofleet_core::prelude::*;

fn assert_no_shared_cells(engine: &SimulationEngine) {
    let cells = engine.snapshot().robot_cells();
    let unique: HashSet<Cell> = cells.iter().copied().collect();
    assert_eq!(unique.len(), cells.len(), "two robots share a cell: {cells:?}");
}

/// Tick to completion, checking the no-overlap rule after every step.
fn run_checked(engine: &mut SimulationEngine, max_ticks: u64) -> Vec<SimEvent> {
    let mut events = Vec::new();
    for _ in 0..max_ticks {
        if !engine.has_active_orders() {
            break;
        }
        events.extend(engine.tick());
        assert_no_shared_cells(engine);
    }
    events
}

#[test]
fn five_stop_order_completes() {
    let mut engine = SimulationEngine::initialize(SimConfig::default()).unwrap();
    // Seed 42 fixes the floor plan
    let station = |station_type, x, y| Station {
        station_type,
        cell: Cell::new(x, y),
    };
    assert_eq!(
        engine.stations(),
        [
            station(StationType::Cs, 1, 4),
            station(StationType::Rs, 3, 4),
            station(StationType::Bs, 11, 5),
            station(StationType::Ds, 5, 0),
        ]
    );
    let sequence = [
        StationType::Cs,
        StationType::Rs,
        StationType::Bs,
        StationType::Cs,
        StationType::Ds,
    ];
    let order_id = engine.submit_order(&sequence).unwrap();

    let events = run_checked(&mut engine, 500);

    let order = engine.order(order_id).unwrap();
    assert_eq!(order.state, OrderState::Completed);
    for &visit_id in &order.visit_ids {
        assert_eq!(engine.visit(visit_id).unwrap().state, VisitState::Done);
    }
    let snap = engine.snapshot();
    assert_eq!(snap.pending_visit_count, 0);
    assert_eq!(snap.completed_visit_count, 5);
    assert_eq!(snap.active_order_count, 0);

    let completed: Vec<VisitId> = events.iter().filter_map(SimEvent::completed_visit).collect();
    assert_eq!(completed, order.visit_ids);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SimEvent::OrderCompleted { .. }))
            .count(),
        1
    );
}

#[test]
fn every_move_is_one_orthogonal_step() {
    let mut engine = SimulationEngine::initialize(SimConfig::default()).unwrap();
    engine.submit_preset(OrderPreset::C1, 2).unwrap();

    for _ in 0..500 {
        if !engine.has_active_orders() {
            break;
        }
        let before = engine.snapshot();
        for event in engine.tick() {
            if let SimEvent::Moved { robot_id, to } = event {
                let from = before.robot(robot_id).unwrap().cell;
                assert_eq!(from.manhattan(&to), 1);
                assert!(engine.grid().is_walkable(to));
            }
        }
    }
    assert!(!engine.has_active_orders());
}

#[test]
fn concurrent_random_orders_drain() {
    let config = SimConfig {
        rng_seed: 7,
        ..Default::default()
    };
    let mut engine = SimulationEngine::initialize(config).unwrap();
    for _ in 0..6 {
        engine.submit_random_order().unwrap();
    }

    run_checked(&mut engine, 2_000);

    let stats = engine.stats();
    assert_eq!(stats.completed_orders, 6);
    assert_eq!(stats.failed_visits, 0);
    assert_eq!(engine.snapshot().pending_visit_count, 0);
    // Several orders in flight keep more than one robot working
    assert!(stats.robots.iter().filter(|r| r.busy_ticks > 0).count() >= 2);
}

#[test]
fn crowded_floor_does_not_deadlock() {
    // Seed 121 sends robots head-on through narrow gaps
    let config = SimConfig {
        rng_seed: 121,
        ..Default::default()
    };
    let mut engine = SimulationEngine::initialize(config).unwrap();
    for _ in 0..8 {
        engine.submit_random_order().unwrap();
    }

    let events = run_checked(&mut engine, 100_000);

    assert!(!engine.has_active_orders());
    assert!(engine.current_tick() < 1_000);
    let stats = engine.stats();
    assert_eq!(stats.completed_orders, 8);
    assert_eq!(stats.failed_visits, 0);
    let replans = events
        .iter()
        .filter(|e| matches!(e, SimEvent::Replanned { .. }))
        .count();
    assert_eq!(replans as u32, stats.robots.iter().map(|r| r.replans).sum::<u32>());
}

#[test]
fn optimal_strategy_serves_the_same_orders() {
    let config = SimConfig {
        strategy: AllocationStrategy::Optimal,
        ..Default::default()
    };
    let mut engine = SimulationEngine::initialize(config).unwrap();
    for preset in OrderPreset::ALL {
        engine.submit_preset(preset, 1).unwrap();
    }

    run_checked(&mut engine, 2_000);

    assert_eq!(engine.stats().completed_orders, 4);
    assert!(engine.orders().all(|o| o.state == OrderState::Completed));
}

#[test]
fn identical_seeds_replay_identically() {
    let run = || {
        let mut engine = SimulationEngine::initialize(SimConfig::default()).unwrap();
        for _ in 0..3 {
            engine.submit_random_order().unwrap();
        }
        let events = run_checked(&mut engine, 1_000);
        (events, engine.snapshot())
    };
    assert_eq!(run(), run());
}

#[test]
fn reset_then_rerun_matches_first_run() {
    let mut engine = SimulationEngine::initialize(SimConfig::default()).unwrap();
    engine.submit_preset(OrderPreset::C3, 4).unwrap();
    let first = run_checked(&mut engine, 500);

    engine.reset();
    engine.submit_preset(OrderPreset::C3, 4).unwrap();
    let second = run_checked(&mut engine, 500);

    assert_eq!(first, second);
}

#[test]
fn walls_are_routed_around() {
    // A wall down the middle of the floor, open along the top and bottom rows
    let walls: Vec<Cell> = (2..6).map(|y| Cell::new(6, y)).collect();
    let config = SimConfig {
        walls,
        ..Default::default()
    };
    let mut engine = SimulationEngine::initialize(config).unwrap();
    engine.submit_preset(OrderPreset::C0, 1).unwrap();

    for _ in 0..800 {
        if !engine.has_active_orders() {
            break;
        }
        engine.tick();
        assert_no_shared_cells(&engine);
        for cell in engine.snapshot().robot_cells() {
            assert!(!engine.grid().is_wall(cell));
        }
    }
    assert!(engine.orders().all(|o| o.state == OrderState::Completed));
}
