//! A* path planning on the 4-connected grid.
//!
//! Uniform step cost, Manhattan heuristic (admissible and consistent here),
//! so the first time the goal is popped its path is shortest. Entries with
//! equal f-score pop in insertion order, and neighbours are expanded in the
//! fixed order +x, -x, +y, -y, which makes the result a pure function of
//! the inputs.
//!
//! Reconstruction walks a dedicated `came_from` map from goal back to start;
//! the open set is only a priority queue and is never consulted for parents.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::grid::{Cell, GridWorld};

/// Find a shortest path from `start` to `goal`.
///
/// Returns the cells to step through, `start` excluded and `goal` included.
/// `blocked` holds cells occupied by other robots; the goal is never treated
/// as blocked. Returns `Some(vec![])` when `start == goal` and `None` when
/// the goal cannot be reached.
pub fn find_path(
    grid: &GridWorld,
    start: Cell,
    goal: Cell,
    blocked: &HashSet<Cell>,
) -> Option<Vec<Cell>> {
    if !grid.is_in_bounds(start) || !grid.is_walkable(goal) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }

    // (f, insertion sequence, cell); the sequence makes ordering total and FIFO on ties
    let mut open: BinaryHeap<Reverse<(u32, u64, Cell)>> = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, u32> = HashMap::new();
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut seq: u64 = 0;

    g_score.insert(start, 0);
    open.push(Reverse((start.manhattan(&goal), seq, start)));

    while let Some(Reverse((_, _, current))) = open.pop() {
        if current == goal {
            return Some(reconstruct(&came_from, start, goal));
        }
        // Stale entry for an already-expanded cell
        if !closed.insert(current) {
            continue;
        }

        let g = g_score.get(&current).copied().unwrap_or(u32::MAX);
        for next in grid.neighbors(current) {
            if closed.contains(&next) {
                continue;
            }
            if next != goal && blocked.contains(&next) {
                continue;
            }
            let tentative = g + 1;
            if tentative < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                g_score.insert(next, tentative);
                came_from.insert(next, current);
                seq += 1;
                open.push(Reverse((tentative + next.manhattan(&goal), seq, next)));
            }
        }
    }

    None
}

/// Length of the shortest path, or `None` if unreachable.
pub fn path_length(
    grid: &GridWorld,
    start: Cell,
    goal: Cell,
    blocked: &HashSet<Cell>,
) -> Option<u32> {
    find_path(grid, start, goal, blocked).map(|p| p.len() as u32)
}

fn reconstruct(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut node = goal;
    while let Some(&prev) = came_from.get(&node) {
        if prev == start {
            break;
        }
        path.push(prev);
        node = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid() -> GridWorld {
        GridWorld::new(13, 8)
    }

    fn no_blocks() -> HashSet<Cell> {
        HashSet::new()
    }

    fn is_connected(start: Cell, path: &[Cell]) -> bool {
        let mut prev = start;
        for &c in path {
            if prev.manhattan(&c) != 1 {
                return false;
            }
            prev = c;
        }
        true
    }

    #[test]
    fn test_same_cell() {
        let grid = open_grid();
        let c = Cell::new(3, 3);
        assert_eq!(find_path(&grid, c, c, &no_blocks()), Some(vec![]));
    }

    #[test]
    fn test_straight_line() {
        let grid = open_grid();
        let path = find_path(&grid, Cell::new(0, 0), Cell::new(2, 0), &no_blocks()).unwrap();
        assert_eq!(path, vec![Cell::new(1, 0), Cell::new(2, 0)]);
    }

    #[test]
    fn test_tie_break_prefers_x_first() {
        let grid = GridWorld::new(5, 5);
        let path = find_path(&grid, Cell::new(0, 0), Cell::new(2, 2), &no_blocks()).unwrap();
        assert_eq!(
            path,
            vec![
                Cell::new(1, 0),
                Cell::new(2, 0),
                Cell::new(2, 1),
                Cell::new(2, 2)
            ]
        );
    }

    #[test]
    fn test_unobstructed_length_is_manhattan() {
        let grid = open_grid();
        for sx in 0..grid.width() {
            for sy in 0..grid.height() {
                let start = Cell::new(sx, sy);
                for goal in [
                    Cell::new(0, 0),
                    Cell::new(12, 7),
                    Cell::new(6, 3),
                    Cell::new(12, 0),
                ] {
                    let path = find_path(&grid, start, goal, &no_blocks()).unwrap();
                    assert_eq!(path.len() as u32, start.manhattan(&goal));
                    assert!(is_connected(start, &path));
                    if start != goal {
                        assert_eq!(*path.last().unwrap(), goal);
                    }
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let grid = open_grid();
        let blocked: HashSet<Cell> = [Cell::new(5, 3), Cell::new(6, 4)].into_iter().collect();
        let first = find_path(&grid, Cell::new(11, 7), Cell::new(2, 1), &blocked);
        for _ in 0..20 {
            assert_eq!(find_path(&grid, Cell::new(11, 7), Cell::new(2, 1), &blocked), first);
        }
    }

    #[test]
    fn test_detours_around_blocked() {
        let grid = GridWorld::new(5, 5);
        let blocked: HashSet<Cell> = [Cell::new(2, 2)].into_iter().collect();
        let path = find_path(&grid, Cell::new(0, 2), Cell::new(4, 2), &blocked).unwrap();
        assert_eq!(path.len(), 6);
        assert!(!path.contains(&Cell::new(2, 2)));
        assert!(is_connected(Cell::new(0, 2), &path));
    }

    #[test]
    fn test_detours_around_walls() {
        // vertical wall at x=2 with a gap at y=4
        let walls = (0..4).map(|y| Cell::new(2, y));
        let grid = GridWorld::with_walls(5, 5, walls);
        let path = find_path(&grid, Cell::new(0, 0), Cell::new(4, 0), &no_blocks()).unwrap();
        assert_eq!(path.len(), 12);
        assert!(path.contains(&Cell::new(2, 4)));
        assert!(path.iter().all(|c| !grid.is_wall(*c)));
    }

    #[test]
    fn test_goal_never_blocked() {
        let grid = GridWorld::new(5, 5);
        let goal = Cell::new(3, 0);
        let blocked: HashSet<Cell> = [goal].into_iter().collect();
        let path = find_path(&grid, Cell::new(0, 0), goal, &blocked).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(*path.last().unwrap(), goal);
    }

    #[test]
    fn test_unreachable_when_boxed_in() {
        let grid = GridWorld::new(5, 5);
        let blocked: HashSet<Cell> = [Cell::new(1, 0), Cell::new(0, 1)].into_iter().collect();
        assert_eq!(find_path(&grid, Cell::new(0, 0), Cell::new(3, 3), &blocked), None);
    }

    #[test]
    fn test_unreachable_walled_goal() {
        let walls = [
            Cell::new(1, 2),
            Cell::new(3, 2),
            Cell::new(2, 1),
            Cell::new(2, 3),
        ];
        let grid = GridWorld::with_walls(5, 5, walls);
        assert_eq!(find_path(&grid, Cell::new(0, 0), Cell::new(2, 2), &no_blocks()), None);
        // goal on a wall
        assert_eq!(find_path(&grid, Cell::new(0, 0), Cell::new(1, 2), &no_blocks()), None);
    }

    #[test]
    fn test_out_of_bounds_goal() {
        let grid = GridWorld::new(5, 5);
        assert_eq!(find_path(&grid, Cell::new(0, 0), Cell::new(9, 9), &no_blocks()), None);
    }

    #[test]
    fn test_path_length() {
        let grid = open_grid();
        assert_eq!(
            path_length(&grid, Cell::new(10, 7), Cell::new(3, 2), &no_blocks()),
            Some(12)
        );
    }
}
