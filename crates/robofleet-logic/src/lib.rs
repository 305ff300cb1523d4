//! Pure fleet logic for robofleet.
//!
//! Everything here is stateless: functions take plain data and return
//! results, so they can be unit-tested in isolation and reused by the
//! engine, the headless harness, or any other caller.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`allocation`] | Greedy and exact robot-to-visit assignment |
//! | [`grid`] | Cells, bounds, walls, neighbours, station placement |
//! | [`pathfinding`] | Deterministic A* over the 4-connected grid |
//! | [`stations`] | Station types, placed stations, order presets |

pub mod allocation;
pub mod grid;
pub mod pathfinding;
pub mod stations;
