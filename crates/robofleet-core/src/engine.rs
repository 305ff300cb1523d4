//! Simulation engine - main entry point for running the simulation

use std::collections::{HashMap, HashSet};

use hecs::{Entity, World};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use robofleet_logic::allocation::{
    priority_cost, RobotCandidate, RobotId, VisitCandidate, VisitId,
};
use robofleet_logic::grid::{Cell, GridWorld};
use robofleet_logic::pathfinding::{find_path, path_length};
use robofleet_logic::stations::{
    self, parse_sequence, OrderPreset, Station, StationType, MAX_PRIORITY, MIN_PRIORITY,
};

use crate::components::{GridPos, Mission, Odometer, Robot, RobotState};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::events::SimEvent;
use crate::orders::{Order, OrderBook, OrderId, OrderState, ReleaseOutcome, Visit, VisitState};
use crate::snapshot::{RobotStats, RobotView, SimStats, Snapshot};

/// Priority given to orders submitted without one.
pub const DEFAULT_PRIORITY: u8 = MIN_PRIORITY;

/// Everything that changes during a run. Rebuilt from scratch on reset.
struct SimulationState {
    tick: u64,
    grid: GridWorld,
    stations: Vec<Station>,
    /// Robot entities
    world: World,
    /// Robot entities in ascending id order; robot `n` sits at index `n - 1`
    roster: Vec<Entity>,
    orders: OrderBook,
}

impl SimulationState {
    fn new(config: &SimConfig, stations: Vec<Station>) -> Self {
        let mut world = World::new();
        let roster = config
            .robot_spawn_cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| {
                world.spawn((
                    Robot {
                        id: i as RobotId + 1,
                    },
                    GridPos(cell),
                    Odometer::default(),
                ))
            })
            .collect();

        Self {
            tick: 0,
            grid: config.grid(),
            stations,
            world,
            roster,
            orders: OrderBook::new(),
        }
    }
}

/// Result of [`SimulationEngine::run_until_idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub ticks_run: u64,
    /// No active orders remain.
    pub finished: bool,
}

/// Main simulation engine
///
/// Single-threaded and synchronous: all mutation happens inside [`tick`],
/// so pausing or resetting between ticks is always safe. Pacing belongs to
/// the caller.
///
/// [`tick`]: SimulationEngine::tick
pub struct SimulationEngine {
    config: SimConfig,
    initial_stations: Vec<Station>,
    /// Order RNG as it was right after station placement
    initial_rng: StdRng,
    rng: StdRng,
    state: SimulationState,
    paused: bool,
}

impl SimulationEngine {
    /// Validate the configuration, place stations and spawn robots.
    pub fn initialize(config: SimConfig) -> Result<Self, SimError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(SimError::InvalidConfig(errors));
        }

        let mut rng = StdRng::seed_from_u64(config.rng_seed);
        let stations = config
            .grid()
            .place_stations(&config.station_types, &mut rng)?;

        info!(
            "simulation initialized: {}x{} grid, {} robots, {} stations, seed {}",
            config.width,
            config.height,
            config.robot_spawn_cells.len(),
            stations.len(),
            config.rng_seed
        );
        for s in &stations {
            debug!("station {} at {}", s.station_type, s.cell);
        }

        Ok(Self::assemble(config, stations, rng))
    }

    /// Build an engine around already placed stations. `rng` is the order
    /// RNG in the state reset returns to.
    fn assemble(config: SimConfig, stations: Vec<Station>, rng: StdRng) -> Self {
        let state = SimulationState::new(&config, stations.clone());
        Self {
            config,
            initial_stations: stations,
            initial_rng: rng.clone(),
            rng,
            state,
            paused: false,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridWorld {
        &self.state.grid
    }

    pub fn stations(&self) -> &[Station] {
        &self.state.stations
    }

    pub fn current_tick(&self) -> u64 {
        self.state.tick
    }

    // ── Orders ─────────────────────────────────────────────────────────

    /// Submit an order at the default priority.
    pub fn submit_order(&mut self, sequence: &[StationType]) -> Result<OrderId, SimError> {
        self.submit_order_with_priority(sequence, DEFAULT_PRIORITY)
    }

    /// Submit an order; every visit inherits `priority`.
    ///
    /// Fails without creating anything if the sequence is empty, the
    /// priority is out of range, or a station type is not on this floor.
    pub fn submit_order_with_priority(
        &mut self,
        sequence: &[StationType],
        priority: u8,
    ) -> Result<OrderId, SimError> {
        if sequence.is_empty() {
            return Err(SimError::EmptyOrder);
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(SimError::InvalidPriority(priority));
        }
        let stops = sequence
            .iter()
            .map(|&t| {
                stations::station_cell(&self.state.stations, t)
                    .map(|cell| (t, cell))
                    .ok_or_else(|| SimError::InvalidStationType(t.code().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let order_id = self.state.orders.submit(&stops, priority);
        info!(
            "order {} submitted: {} visits, priority {}",
            order_id,
            stops.len(),
            priority
        );
        Ok(order_id)
    }

    /// Submit an order given as station codes, e.g. `["CS", "RS", "DS"]`.
    pub fn submit_order_codes<S: AsRef<str>>(
        &mut self,
        codes: &[S],
        priority: u8,
    ) -> Result<OrderId, SimError> {
        let sequence = parse_sequence(codes)?;
        self.submit_order_with_priority(&sequence, priority)
    }

    pub fn submit_preset(&mut self, preset: OrderPreset, priority: u8) -> Result<OrderId, SimError> {
        self.submit_order_with_priority(preset.sequence(), priority)
    }

    /// Submit a random preset at a random priority, drawn from the seeded RNG.
    pub fn submit_random_order(&mut self) -> Result<OrderId, SimError> {
        let (preset, priority) = stations::random_order(&mut self.rng);
        debug!("random order: preset {} priority {}", preset.name(), priority);
        self.submit_preset(preset, priority)
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.state.orders.order(id)
    }

    pub fn visit(&self, id: VisitId) -> Option<&Visit> {
        self.state.orders.visit(id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.state.orders.orders()
    }

    pub fn has_active_orders(&self) -> bool {
        self.state.orders.has_active_orders()
    }

    // ── Control ────────────────────────────────────────────────────────

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Restore the state right after `initialize`: same robots, same
    /// stations, no orders, tick zero.
    pub fn reset(&mut self) {
        self.state = SimulationState::new(&self.config, self.initial_stations.clone());
        self.rng = self.initial_rng.clone();
        self.paused = false;
        info!("simulation reset");
    }

    /// Tick until no active orders remain, the engine is paused, or
    /// `max_ticks` have run.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> RunOutcome {
        let mut ticks_run = 0;
        while ticks_run < max_ticks && !self.paused && self.has_active_orders() {
            self.tick();
            ticks_run += 1;
        }
        RunOutcome {
            ticks_run,
            finished: !self.has_active_orders(),
        }
    }

    // ── Stepping ───────────────────────────────────────────────────────

    /// Advance one discrete step and return what happened.
    ///
    /// Phases, each over robots in ascending id order:
    /// 1. allocate idle robots to pending visits
    /// 2. plan paths for newly assigned robots
    /// 3. move one cell, or wait / replan when the next cell is taken
    /// 4. complete visits for robots touching their station
    ///
    /// A no-op while paused or when there is nothing to do.
    pub fn tick(&mut self) -> Vec<SimEvent> {
        if self.paused {
            return Vec::new();
        }
        if self.state.roster.is_empty() || !self.state.orders.has_active_orders() {
            debug!("tick {} skipped: no active orders", self.state.tick);
            return Vec::new();
        }

        let mut events = Vec::new();
        self.allocate(&mut events);
        self.plan_assigned(&mut events);
        self.advance_robots(&mut events);
        self.record_busy();
        self.complete_visits(&mut events);
        self.state.tick += 1;
        events
    }

    fn allocate(&mut self, events: &mut Vec<SimEvent>) {
        let idle: Vec<RobotCandidate> = self
            .state
            .roster
            .iter()
            .filter(|&&e| self.state.world.get::<&Mission>(e).is_err())
            .filter_map(|&e| self.robot_at(e))
            .map(|(robot_id, cell)| RobotCandidate { robot_id, cell })
            .collect();
        let pending: Vec<VisitCandidate> = self
            .state
            .orders
            .pending()
            .map(|v| VisitCandidate {
                visit_id: v.id,
                cell: v.station_cell,
                priority: v.priority,
            })
            .collect();
        if idle.is_empty() || pending.is_empty() {
            return;
        }

        // Costs use the static map only; traffic is handled when planning
        let grid = &self.state.grid;
        let weight = self.config.priority_weight;
        let no_traffic = HashSet::new();
        let mut routable: HashSet<VisitId> = HashSet::new();
        let assignments = self.config.strategy.allocate(&idle, &pending, |r, v| {
            let len = path_length(grid, r.cell, v.cell, &no_traffic)?;
            routable.insert(v.visit_id);
            Some(priority_cost(len, v.priority, weight))
        });

        for a in assignments {
            let Some(entity) = self.entity_of(a.robot_id) else {
                continue;
            };
            let Some(target) = self.state.orders.visit(a.visit_id).map(|v| v.station_cell) else {
                continue;
            };
            if self
                .state
                .world
                .insert_one(entity, Mission::new(a.visit_id, target))
                .is_err()
            {
                continue;
            }
            self.state.orders.mark_assigned(a.visit_id, a.robot_id);
            debug!(
                "tick {}: robot {} -> visit {} (cost {})",
                self.state.tick, a.robot_id, a.visit_id, a.cost
            );
            events.push(SimEvent::Assigned {
                robot_id: a.robot_id,
                visit_id: a.visit_id,
                cost: a.cost,
            });
        }

        // A visit no robot anywhere can route to counts as a planning failure
        let robot_cells: Vec<Cell> = self.occupancy().into_keys().collect();
        for v in pending.iter().filter(|v| !routable.contains(&v.visit_id)) {
            let reachable_by_any = robot_cells
                .iter()
                .any(|&c| path_length(&self.state.grid, c, v.cell, &no_traffic).is_some());
            if !reachable_by_any {
                warn!("visit {} at {} is walled off from every robot", v.visit_id, v.cell);
                self.release_visit(v.visit_id, events);
            }
        }
    }

    fn plan_assigned(&mut self, events: &mut Vec<SimEvent>) {
        let occupancy = self.occupancy();
        for entity in self.state.roster.clone() {
            let Some((robot_id, cell)) = self.robot_at(entity) else {
                continue;
            };
            let (visit_id, target) = match self.state.world.get::<&Mission>(entity) {
                Ok(m) if m.plan.is_none() => (m.visit_id, m.target),
                _ => continue,
            };

            // Already touching the station: nothing to walk
            let plan = if cell.chebyshev(&target) <= 1 {
                Some(Vec::new())
            } else {
                find_path(
                    &self.state.grid,
                    cell,
                    target,
                    &blocked_except(&occupancy, robot_id),
                )
            };

            match plan {
                Some(path) => {
                    debug!(
                        "robot {} planned {} steps to visit {}",
                        robot_id,
                        path.len(),
                        visit_id
                    );
                    if let Ok(mut m) = self.state.world.get::<&mut Mission>(entity) {
                        m.plan = Some(path.into());
                    }
                    self.state.orders.mark_in_progress(visit_id);
                }
                None => self.abandon_mission(entity, robot_id, visit_id, events),
            }
        }
    }

    fn advance_robots(&mut self, events: &mut Vec<SimEvent>) {
        // Kept current as robots move so later ids see earlier moves
        let mut occupancy = self.occupancy();
        let max_wait = self.config.max_wait_ticks;
        let max_stall_replans = self.config.max_plan_failures;

        for entity in self.state.roster.clone() {
            let Some((robot_id, cell)) = self.robot_at(entity) else {
                continue;
            };
            let step = self
                .state
                .world
                .get::<&Mission>(entity)
                .ok()
                .and_then(|m| m.next_step().map(|next| (m.visit_id, m.target, next)));
            let Some((visit_id, target, next)) = step else {
                continue;
            };

            let occupant = match occupancy.get(&next).copied().filter(|&id| id != robot_id) {
                Some(id) => id,
                None => {
                    occupancy.remove(&cell);
                    occupancy.insert(next, robot_id);
                    if let Ok(mut pos) = self.state.world.get::<&mut GridPos>(entity) {
                        pos.0 = next;
                    }
                    if let Ok(mut m) = self.state.world.get::<&mut Mission>(entity) {
                        if let Some(plan) = m.plan.as_mut() {
                            plan.pop_front();
                        }
                        m.wait_ticks = 0;
                    }
                    if let Ok(mut odo) = self.state.world.get::<&mut Odometer>(entity) {
                        odo.cells_travelled += 1;
                    }
                    events.push(SimEvent::Moved { robot_id, to: next });
                    continue;
                }
            };

            let (wait_ticks, stall_replans) = match self.state.world.get::<&mut Mission>(entity) {
                Ok(mut m) => {
                    m.wait_ticks += 1;
                    (m.wait_ticks, m.stall_replans)
                }
                Err(_) => continue,
            };
            debug!(
                "robot {} blocked at {} by robot {} (next {}, waited {})",
                robot_id, cell, occupant, next, wait_ticks
            );
            events.push(SimEvent::Blocked {
                robot_id,
                at: cell,
                next,
                wait_ticks,
            });
            if wait_ticks <= max_wait {
                continue;
            }

            // Lower id wins: a moving higher-id occupant is the one that routes around
            let occupant_plan = self.moving_plan(occupant);
            if occupant_plan.is_some() && occupant > robot_id {
                continue;
            }
            if stall_replans >= max_stall_replans {
                self.give_up_mission(entity, robot_id, visit_id, events);
                continue;
            }

            // Stall limit exceeded: drop the plan and route around current traffic,
            // keeping clear of the winner's remaining route when possible
            let around_robots = blocked_except(&occupancy, robot_id);
            let mut around_winner = around_robots.clone();
            around_winner.extend(occupant_plan.into_iter().flatten().filter(|&c| c != cell));
            let grid = &self.state.grid;
            let path = find_path(grid, cell, target, &around_winner)
                .or_else(|| find_path(grid, cell, target, &around_robots));

            match path {
                Some(path) => {
                    let path_len = path.len();
                    if let Ok(mut m) = self.state.world.get::<&mut Mission>(entity) {
                        m.plan = Some(path.into());
                        m.wait_ticks = 0;
                        m.stall_replans += 1;
                    }
                    if let Ok(mut odo) = self.state.world.get::<&mut Odometer>(entity) {
                        odo.replans += 1;
                    }
                    warn!(
                        "robot {} stalled {} ticks, replanned {} steps",
                        robot_id, wait_ticks, path_len
                    );
                    events.push(SimEvent::Replanned {
                        robot_id,
                        visit_id,
                        path_len,
                    });
                }
                None => self.abandon_mission(entity, robot_id, visit_id, events),
            }
        }
    }

    fn record_busy(&mut self) {
        for (_, (odo, _)) in self.state.world.query_mut::<(&mut Odometer, &Mission)>() {
            odo.busy_ticks += 1;
        }
    }

    fn complete_visits(&mut self, events: &mut Vec<SimEvent>) {
        for entity in self.state.roster.clone() {
            let Some((robot_id, cell)) = self.robot_at(entity) else {
                continue;
            };
            let arrived = matches!(
                self.state.world.get::<&Mission>(entity),
                Ok(m) if m.plan.is_some() && cell.chebyshev(&m.target) <= 1
            );
            if !arrived {
                continue;
            }
            let Ok(mission) = self.state.world.remove_one::<Mission>(entity) else {
                continue;
            };

            events.push(SimEvent::VisitCompleted {
                robot_id,
                cell,
                visit_id: mission.visit_id,
            });
            let Some(completion) = self.state.orders.complete(mission.visit_id) else {
                continue;
            };
            debug!(
                "tick {}: robot {} completed visit {} at {}",
                self.state.tick, robot_id, mission.visit_id, cell
            );
            if completion.order_done {
                info!(
                    "order {} completed at tick {}",
                    completion.order_id, self.state.tick
                );
                events.push(SimEvent::OrderCompleted {
                    order_id: completion.order_id,
                });
            }
        }
    }

    /// Drop a robot's mission after a failed plan and hand the visit back.
    fn abandon_mission(
        &mut self,
        entity: Entity,
        robot_id: RobotId,
        visit_id: VisitId,
        events: &mut Vec<SimEvent>,
    ) {
        let _ = self.state.world.remove_one::<Mission>(entity);
        warn!("robot {} has no route to visit {}", robot_id, visit_id);
        events.push(SimEvent::Unreachable { robot_id, visit_id });
        self.release_visit(visit_id, events);
    }

    /// Drop a mission that keeps stalling after replans; counts as a planning failure.
    fn give_up_mission(
        &mut self,
        entity: Entity,
        robot_id: RobotId,
        visit_id: VisitId,
        events: &mut Vec<SimEvent>,
    ) {
        let _ = self.state.world.remove_one::<Mission>(entity);
        warn!(
            "robot {} gave up on visit {} after {} stall replans",
            robot_id, visit_id, self.config.max_plan_failures
        );
        events.push(SimEvent::Stalled { robot_id, visit_id });
        self.release_visit(visit_id, events);
    }

    fn release_visit(&mut self, visit_id: VisitId, events: &mut Vec<SimEvent>) {
        let max_failures = self.config.max_plan_failures;
        if let ReleaseOutcome::Failed { order_id } = self.state.orders.release(visit_id, max_failures)
        {
            warn!(
                "visit {} failed after {} planning failures; order {} abandoned",
                visit_id, max_failures, order_id
            );
            events.push(SimEvent::VisitFailed { visit_id, order_id });
        }
    }

    // ── Queries ────────────────────────────────────────────────────────

    fn entity_of(&self, robot_id: RobotId) -> Option<Entity> {
        let index = (robot_id as usize).checked_sub(1)?;
        self.state.roster.get(index).copied()
    }

    fn robot_at(&self, entity: Entity) -> Option<(RobotId, Cell)> {
        let robot = self.state.world.get::<&Robot>(entity).ok()?;
        let pos = self.state.world.get::<&GridPos>(entity).ok()?;
        Some((robot.id, pos.0))
    }

    /// Remaining route of a robot that has a next step to take.
    fn moving_plan(&self, robot_id: RobotId) -> Option<Vec<Cell>> {
        let entity = self.entity_of(robot_id)?;
        let mission = self.state.world.get::<&Mission>(entity).ok()?;
        let plan = mission.plan.as_ref().filter(|p| !p.is_empty())?;
        Some(plan.iter().copied().collect())
    }

    /// Cell → robot standing on it.
    fn occupancy(&self) -> HashMap<Cell, RobotId> {
        self.state
            .roster
            .iter()
            .filter_map(|&e| self.robot_at(e))
            .map(|(id, cell)| (cell, id))
            .collect()
    }

    /// Read-only view for rendering.
    pub fn snapshot(&self) -> Snapshot {
        let robots = self
            .state
            .roster
            .iter()
            .filter_map(|&e| {
                let (id, cell) = self.robot_at(e)?;
                let mission = self.state.world.get::<&Mission>(e).ok();
                Some(RobotView {
                    id,
                    cell,
                    busy: mission.is_some(),
                    current_visit: mission.as_ref().map(|m| m.visit_id),
                    state: mission.as_ref().map_or(RobotState::Idle, |m| m.state()),
                    remaining_path: mission.as_ref().map_or(0, |m| m.remaining_steps()),
                })
            })
            .collect();

        let orders = &self.state.orders;
        Snapshot {
            tick: self.state.tick,
            paused: self.paused,
            robots,
            stations: self.state.stations.clone(),
            pending_visit_count: orders.outstanding_count(),
            completed_visit_count: orders.count_visits(VisitState::Done),
            failed_visit_count: orders.count_visits(VisitState::Failed),
            active_order_count: orders.count_orders(OrderState::Active),
        }
    }

    pub fn stats(&self) -> SimStats {
        let ticks = self.state.tick;
        let robots = self
            .state
            .roster
            .iter()
            .filter_map(|&e| {
                let robot = self.state.world.get::<&Robot>(e).ok()?;
                let odo = self.state.world.get::<&Odometer>(e).ok()?;
                let utilization = if ticks == 0 {
                    0.0
                } else {
                    odo.busy_ticks as f32 / ticks as f32
                };
                Some(RobotStats {
                    id: robot.id,
                    busy_ticks: odo.busy_ticks,
                    cells_travelled: odo.cells_travelled,
                    replans: odo.replans,
                    utilization,
                })
            })
            .collect();

        let orders = &self.state.orders;
        SimStats {
            ticks,
            completed_visits: orders.count_visits(VisitState::Done),
            failed_visits: orders.count_visits(VisitState::Failed),
            completed_orders: orders.count_orders(OrderState::Completed),
            robots,
        }
    }
}

/// Occupied cells other than `robot_id`'s own.
fn blocked_except(occupancy: &HashMap<Cell, RobotId>, robot_id: RobotId) -> HashSet<Cell> {
    occupancy
        .iter()
        .filter(|&(_, &id)| id != robot_id)
        .map(|(&cell, _)| cell)
        .collect()
}
