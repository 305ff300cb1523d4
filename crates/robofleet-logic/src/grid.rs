//! Grid geometry: cells, bounds, walls, neighbours, station placement.
//!
//! `GridWorld` is static once built: it answers queries and places stations,
//! nothing else. Robots and their occupancy live in the engine.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stations::{Station, StationType};

/// An integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 4-connected step distance.
    pub fn manhattan(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// King-move distance; 1 means "touching", diagonals included.
    pub fn chebyshev(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Neighbour offsets in exploration order: +x, -x, +y, -y.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Station placement failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("not enough free cells to place stations: {free} free, {needed} needed")]
    NotEnoughFreeCells { free: usize, needed: usize },
}

/// Static map geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridWorld {
    width: i32,
    height: i32,
    walls: HashSet<Cell>,
}

impl GridWorld {
    /// An open grid with no walls.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            walls: HashSet::new(),
        }
    }

    /// A grid with static wall cells. Out-of-bounds walls are ignored.
    pub fn with_walls(width: i32, height: i32, walls: impl IntoIterator<Item = Cell>) -> Self {
        let mut grid = Self::new(width, height);
        grid.walls = walls
            .into_iter()
            .filter(|c| grid.is_in_bounds(*c))
            .collect();
        grid
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }

    pub fn is_in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    pub fn is_wall(&self, cell: Cell) -> bool {
        self.walls.contains(&cell)
    }

    /// In bounds and not a wall.
    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.is_in_bounds(cell) && !self.is_wall(cell)
    }

    pub fn walls(&self) -> impl Iterator<Item = &Cell> {
        self.walls.iter()
    }

    /// Walkable cells, 4-connected, in the fixed order +x, -x, +y, -y.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |&(dx, dy)| Cell::new(cell.x + dx, cell.y + dy))
            .filter(move |c| self.is_walkable(*c))
    }

    /// Number of walkable cells.
    pub fn free_cell_count(&self) -> usize {
        self.cell_count() - self.walls.len()
    }

    /// Give each station type a distinct random walkable cell.
    ///
    /// Draws uniformly over the whole grid and resamples on any collision
    /// (wall or already-used cell). Same rng state, same layout.
    pub fn place_stations<R: Rng + ?Sized>(
        &self,
        types: &[StationType],
        rng: &mut R,
    ) -> Result<Vec<Station>, PlacementError> {
        let free = self.free_cell_count();
        if types.len() > free {
            return Err(PlacementError::NotEnoughFreeCells {
                free,
                needed: types.len(),
            });
        }

        let mut used: HashSet<Cell> = HashSet::with_capacity(types.len());
        let mut stations = Vec::with_capacity(types.len());
        for &station_type in types {
            let cell = loop {
                let candidate = Cell::new(
                    rng.gen_range(0..self.width),
                    rng.gen_range(0..self.height),
                );
                if self.is_walkable(candidate) && !used.contains(&candidate) {
                    break candidate;
                }
            };
            used.insert(cell);
            stations.push(Station { station_type, cell });
        }
        Ok(stations)
    }
}
