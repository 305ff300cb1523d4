//! RoboFleet Headless Simulation Harness
//!
//! Runs the engine against scripted scenarios and checks fleet invariants
//! after every tick. Runs entirely in-process, no rendering.
//!
//! Usage:
//!   cargo run -p robofleet-simtest
//!   cargo run -p robofleet-simtest -- --verbose
//!   cargo run -p robofleet-simtest -- --json --seed 7

use std::collections::HashSet;

use clap::Parser;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use robofleet_core::prelude::*;
use robofleet_logic::allocation::{self, RobotCandidate, VisitCandidate};
use robofleet_logic::grid::GridWorld;
use robofleet_logic::pathfinding::path_length;
use serde::{Deserialize, Serialize};

// ── Scenario data ───────────────────────────────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../../../data/scenarios.json");

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    config: SimConfig,
    #[serde(default)]
    orders: Vec<OrderSpec>,
    #[serde(default)]
    random_orders: u32,
    max_ticks: u64,
}

#[derive(Debug, Deserialize)]
struct OrderSpec {
    #[serde(default)]
    codes: Vec<String>,
    #[serde(default)]
    preset: Option<String>,
    priority: u8,
}

/// Headless scenario runner for the RoboFleet engine.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Print every check and enable debug logging.
    #[arg(long)]
    verbose: bool,

    /// Emit per-scenario statistics as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Override the RNG seed of every scenario.
    #[arg(long)]
    seed: Option<u64>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Serialize)]
struct ScenarioReport {
    name: String,
    finished: bool,
    stats: SimStats,
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    println!("=== RoboFleet Simulation Harness ===\n");

    let mut results = Vec::new();
    let mut reports = Vec::new();

    // 1. Scripted scenarios
    let (scenario_results, scenario_reports) = run_scenarios(&args);
    results.extend(scenario_results);
    reports.extend(scenario_reports);

    // 2. Engine control surface
    results.extend(validate_controls());

    // 3. Pathfinding sweep on open floors
    results.extend(validate_pathfinding(args.seed.unwrap_or(42)));

    // 4. Greedy vs optimal allocation
    results.extend(validate_allocation(args.seed.unwrap_or(42)));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize reports: {e}"),
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Scenarios ────────────────────────────────────────────────────────

fn run_scenarios(args: &Args) -> (Vec<TestResult>, Vec<ScenarioReport>) {
    println!("--- Scenarios ---");
    let mut results = Vec::new();
    let mut reports = Vec::new();

    let scenarios: Vec<Scenario> = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return (results, reports);
        }
    };
    results.push(TestResult {
        name: "scenarios_parse".into(),
        passed: !scenarios.is_empty(),
        detail: format!("{} scenarios", scenarios.len()),
    });

    for mut scenario in scenarios {
        if let Some(seed) = args.seed {
            scenario.config.rng_seed = seed;
        }
        info!("scenario {}: {}", scenario.name, scenario.description);
        let (mut r, report) = run_scenario(&scenario);
        if args.verbose {
            if let Some(report) = &report {
                for robot in &report.stats.robots {
                    println!(
                        "    {} robot {}: {:.0}% busy, {} cells, {} replans",
                        scenario.name,
                        robot.id,
                        robot.utilization * 100.0,
                        robot.cells_travelled,
                        robot.replans
                    );
                }
            }
        }
        results.append(&mut r);
        reports.extend(report);
    }

    (results, reports)
}

fn run_scenario(scenario: &Scenario) -> (Vec<TestResult>, Option<ScenarioReport>) {
    let name = &scenario.name;
    let mut results = Vec::new();

    let mut engine = match SimulationEngine::initialize(scenario.config.clone()) {
        Ok(e) => e,
        Err(e) => {
            results.push(TestResult {
                name: format!("{name}_init"),
                passed: false,
                detail: e.to_string(),
            });
            return (results, None);
        }
    };

    let mut submit_errors = Vec::new();
    for order in &scenario.orders {
        let submitted = match order.preset.as_deref() {
            Some(p) => match OrderPreset::from_name(p) {
                Some(preset) => engine.submit_preset(preset, order.priority),
                None => {
                    submit_errors.push(format!("unknown preset {p}"));
                    continue;
                }
            },
            None => engine.submit_order_codes(&order.codes, order.priority),
        };
        if let Err(e) = submitted {
            submit_errors.push(e.to_string());
        }
    }
    for _ in 0..scenario.random_orders {
        if let Err(e) = engine.submit_random_order() {
            submit_errors.push(e.to_string());
        }
    }
    results.push(TestResult {
        name: format!("{name}_submit"),
        passed: submit_errors.is_empty(),
        detail: if submit_errors.is_empty() {
            format!("{} orders", engine.orders().count())
        } else {
            submit_errors.join("; ")
        },
    });

    let mut violations: Vec<String> = Vec::new();
    let mut ticks = 0;
    while ticks < scenario.max_ticks && engine.has_active_orders() {
        let before = engine.snapshot();
        let events = engine.tick();
        ticks += 1;
        violations.extend(check_tick(&engine, &before, &events));
        if violations.len() > 5 {
            break;
        }
    }
    debug!("{name}: ran {ticks} ticks");

    results.push(TestResult {
        name: format!("{name}_invariants"),
        passed: violations.is_empty(),
        detail: if violations.is_empty() {
            format!("{ticks} ticks clean")
        } else {
            violations.join("; ")
        },
    });

    let snap = engine.snapshot();
    let finished = !engine.has_active_orders();
    let all_completed = engine.orders().all(|o| o.state == OrderState::Completed);
    results.push(TestResult {
        name: format!("{name}_complete"),
        passed: finished && all_completed && snap.pending_visit_count == 0,
        detail: format!(
            "{} visits done, {} failed, {} outstanding after {} ticks",
            snap.completed_visit_count, snap.failed_visit_count, snap.pending_visit_count, ticks
        ),
    });

    let report = ScenarioReport {
        name: name.clone(),
        finished,
        stats: engine.stats(),
    };
    (results, Some(report))
}

/// Fleet rules that must hold after every tick.
fn check_tick(engine: &SimulationEngine, before: &Snapshot, events: &[SimEvent]) -> Vec<String> {
    let mut violations = Vec::new();
    let after = engine.snapshot();
    let tick = after.tick;

    let cells = after.robot_cells();
    let unique: HashSet<Cell> = cells.iter().copied().collect();
    if unique.len() != cells.len() {
        violations.push(format!("tick {tick}: robots share a cell {cells:?}"));
    }

    for robot in &after.robots {
        let Some(prev) = before.robot(robot.id) else {
            continue;
        };
        if prev.cell.manhattan(&robot.cell) > 1 {
            violations.push(format!(
                "tick {tick}: robot {} jumped {} -> {}",
                robot.id, prev.cell, robot.cell
            ));
        }
        if !engine.grid().is_walkable(robot.cell) {
            violations.push(format!("tick {tick}: robot {} on {}", robot.id, robot.cell));
        }
    }

    // Within an order only the head visit may be in flight
    for order in engine.orders() {
        let in_flight = order
            .visit_ids
            .iter()
            .filter_map(|&id| engine.visit(id))
            .filter(|v| {
                matches!(
                    v.state,
                    VisitState::Pending | VisitState::Assigned | VisitState::InProgress
                )
            })
            .count();
        if in_flight > 1 {
            violations.push(format!("tick {tick}: order {} has {in_flight} visits in flight", order.id));
        }
    }

    for event in events {
        if let SimEvent::VisitCompleted { cell, visit_id, .. } = event {
            let near = engine
                .visit(*visit_id)
                .map_or(false, |v| v.station_cell.chebyshev(cell) <= 1);
            if !near {
                violations.push(format!("tick {tick}: visit {visit_id} completed away from its station"));
            }
        }
    }

    violations
}

// ── 2. Controls ─────────────────────────────────────────────────────────

fn validate_controls() -> Vec<TestResult> {
    println!("--- Controls ---");
    let mut results = Vec::new();

    let mut engine = match SimulationEngine::initialize(SimConfig::default()) {
        Ok(e) => e,
        Err(e) => {
            results.push(TestResult {
                name: "controls_init".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };
    let initial = engine.snapshot();

    let idle_events = engine.tick();
    results.push(TestResult {
        name: "tick_without_orders".into(),
        passed: idle_events.is_empty() && engine.current_tick() == 0,
        detail: "no orders → no events, tick unchanged".into(),
    });

    let submitted = engine.submit_preset(OrderPreset::C2, 2).is_ok();
    engine.pause();
    let paused_events = engine.tick();
    results.push(TestResult {
        name: "paused_tick_noop".into(),
        passed: submitted && paused_events.is_empty() && engine.current_tick() == 0,
        detail: "paused → tick is a no-op".into(),
    });

    engine.resume();
    for _ in 0..10 {
        engine.tick();
    }
    let advanced = engine.current_tick() == 10;
    engine.reset();
    results.push(TestResult {
        name: "reset_restores_initial".into(),
        passed: advanced && engine.snapshot() == initial && engine.orders().count() == 0,
        detail: "reset → tick 0, spawn cells, same stations, no orders".into(),
    });

    results.push(TestResult {
        name: "reject_bad_priority".into(),
        passed: engine.submit_order_with_priority(&[StationType::Cs], 0)
            == Err(SimError::InvalidPriority(0)),
        detail: "priority 0 rejected".into(),
    });
    results.push(TestResult {
        name: "reject_unknown_code".into(),
        passed: matches!(
            engine.submit_order_codes(&["CS", "XX"], 1),
            Err(SimError::InvalidStationType(_))
        ) && engine.orders().count() == 0,
        detail: "unknown station code rejected, nothing created".into(),
    });

    results
}

// ── 3. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding(seed: u64) -> Vec<TestResult> {
    println!("--- Pathfinding ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let grid = GridWorld::new(13, 8);
    let clear = HashSet::new();

    let mut mismatches = Vec::new();
    for _ in 0..200 {
        let a = Cell::new(rng.gen_range(0..13), rng.gen_range(0..8));
        let b = Cell::new(rng.gen_range(0..13), rng.gen_range(0..8));
        if path_length(&grid, a, b, &clear) != Some(a.manhattan(&b)) {
            mismatches.push(format!("{a}->{b}"));
        }
    }
    results.push(TestResult {
        name: "open_floor_is_manhattan".into(),
        passed: mismatches.is_empty(),
        detail: if mismatches.is_empty() {
            "200 random pairs match Manhattan distance".into()
        } else {
            mismatches.join(", ")
        },
    });

    let boxed: HashSet<Cell> = [Cell::new(1, 0), Cell::new(0, 1)].into_iter().collect();
    results.push(TestResult {
        name: "boxed_in_is_unreachable".into(),
        passed: path_length(&grid, Cell::new(0, 0), Cell::new(5, 5), &boxed).is_none(),
        detail: "start surrounded by robots → no path".into(),
    });

    results
}

// ── 4. Allocation ───────────────────────────────────────────────────────

fn validate_allocation(seed: u64) -> Vec<TestResult> {
    println!("--- Allocation ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let grid = GridWorld::new(13, 8);
    let clear = HashSet::new();

    let mut worse = 0;
    let mut trials = 0;
    for _ in 0..100 {
        let robots: Vec<RobotCandidate> = (1..=3)
            .map(|robot_id| RobotCandidate {
                robot_id,
                cell: Cell::new(rng.gen_range(0..13), rng.gen_range(0..8)),
            })
            .collect();
        let visits: Vec<VisitCandidate> = (1..=rng.gen_range(1..=5u64))
            .map(|visit_id| VisitCandidate {
                visit_id,
                cell: Cell::new(rng.gen_range(0..13), rng.gen_range(0..8)),
                priority: rng.gen_range(1..=4),
            })
            .collect();
        let cost = |r: &RobotCandidate, v: &VisitCandidate| {
            path_length(&grid, r.cell, v.cell, &clear)
                .map(|len| allocation::priority_cost(len, v.priority, 1))
        };
        let greedy = allocation::assign(&robots, &visits, cost);
        let optimal = allocation::assign_optimal(&robots, &visits, cost);
        trials += 1;
        if greedy.len() != optimal.len()
            || allocation::total_cost(&optimal) > allocation::total_cost(&greedy)
        {
            worse += 1;
        }
    }
    results.push(TestResult {
        name: "optimal_never_worse".into(),
        passed: worse == 0,
        detail: format!("{worse}/{trials} instances where optimal lost to greedy"),
    });

    results
}
