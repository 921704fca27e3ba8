use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use super::grid::{in_bounds, manhattan, neighbors_4, Cell};

/// Snapshot of the walkable world used for a single path query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridSpec {
    pub width: u32,
    pub height: u32,
    pub blocked: HashSet<Cell>,
}

impl GridSpec {
    pub fn new(width: u32, height: u32, blocked: HashSet<Cell>) -> Self {
        Self {
            width,
            height,
            blocked,
        }
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        in_bounds(cell, self.width, self.height)
    }

    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.blocked.contains(&cell)
    }

    fn index_of(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        Some(cell.y as usize * self.width as usize + cell.x as usize)
    }

    fn cell_of(&self, index: usize) -> Cell {
        let width = self.width as usize;
        Cell::new((index % width) as i32, (index / width) as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    index: usize,
    h_cost: u32,
    f_cost: u32,
    insertion_order: u64,
}

impl OpenNode {
    fn order_key(&self) -> (u32, u32, u64) {
        (self.f_cost, self.h_cost, self.insertion_order)
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* over 4-connected cells with unit step cost and a Manhattan heuristic.
///
/// Returns the start-inclusive, goal-inclusive cell sequence. An empty vector
/// means there is no route (or an endpoint is out of bounds or blocked);
/// `start == goal` on a walkable cell yields `[start]`.
///
/// Ties on f-cost break on the lower h-cost, then on insertion order, so the
/// same query always yields the same path.
pub fn find_path(start: Cell, goal: Cell, grid: &GridSpec) -> Vec<Cell> {
    let (Some(start_index), Some(goal_index)) = (grid.index_of(start), grid.index_of(goal)) else {
        return Vec::new();
    };
    if grid.blocked.contains(&start) || grid.blocked.contains(&goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let node_count = grid.width as usize * grid.height as usize;
    let mut closed = vec![false; node_count];
    let mut best_g = vec![u32::MAX; node_count];
    let mut parent = vec![None::<usize>; node_count];
    let mut open = BinaryHeap::new();
    let mut next_insertion = 0u64;

    let start_h = manhattan(start, goal);
    open.push(Reverse(OpenNode {
        index: start_index,
        h_cost: start_h,
        f_cost: start_h,
        insertion_order: next_insertion,
    }));
    next_insertion = next_insertion.saturating_add(1);
    best_g[start_index] = 0;

    while let Some(Reverse(current)) = open.pop() {
        if closed[current.index] {
            continue;
        }
        closed[current.index] = true;

        if current.index == goal_index {
            return reconstruct_path(grid, &parent, start_index, goal_index);
        }

        let current_g = best_g[current.index];
        for neighbor in neighbors_4(grid.cell_of(current.index)) {
            let Some(neighbor_index) = grid.index_of(neighbor) else {
                continue;
            };
            if closed[neighbor_index] || grid.blocked.contains(&neighbor) {
                continue;
            }

            let tentative_g = current_g.saturating_add(1);
            if tentative_g >= best_g[neighbor_index] {
                continue;
            }

            best_g[neighbor_index] = tentative_g;
            parent[neighbor_index] = Some(current.index);
            let h_cost = manhattan(neighbor, goal);
            open.push(Reverse(OpenNode {
                index: neighbor_index,
                h_cost,
                f_cost: tentative_g.saturating_add(h_cost),
                insertion_order: next_insertion,
            }));
            next_insertion = next_insertion.saturating_add(1);
        }
    }

    Vec::new()
}

fn reconstruct_path(
    grid: &GridSpec,
    parent: &[Option<usize>],
    start_index: usize,
    goal_index: usize,
) -> Vec<Cell> {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];

    while cursor != start_index {
        let Some(next) = parent.get(cursor).copied().flatten() else {
            return Vec::new();
        };
        cursor = next;
        indices.push(cursor);
    }
    indices.reverse();
    indices
        .into_iter()
        .map(|index| grid.cell_of(index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(width: u32, height: u32) -> GridSpec {
        GridSpec::new(width, height, HashSet::new())
    }

    fn assert_four_connected(path: &[Cell]) {
        for pair in path.windows(2) {
            assert_eq!(manhattan(pair[0], pair[1]), 1, "jump in path {path:?}");
        }
    }

    #[test]
    fn same_cell_returns_single_element_path() {
        let grid = open_grid(4, 4);
        assert_eq!(
            find_path(Cell::new(1, 1), Cell::new(1, 1), &grid),
            vec![Cell::new(1, 1)]
        );
    }

    #[test]
    fn open_grid_path_length_matches_manhattan_distance() {
        let grid = open_grid(10, 8);
        let start = Cell::new(1, 2);
        let goal = Cell::new(8, 6);
        let path = find_path(start, goal, &grid);
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        assert_eq!(path.len() as u32, manhattan(start, goal) + 1);
        assert_four_connected(&path);
    }

    #[test]
    fn blocked_or_out_of_bounds_endpoints_return_empty() {
        let mut grid = open_grid(5, 5);
        grid.blocked.insert(Cell::new(2, 2));

        assert!(find_path(Cell::new(2, 2), Cell::new(0, 0), &grid).is_empty());
        assert!(find_path(Cell::new(0, 0), Cell::new(2, 2), &grid).is_empty());
        assert!(find_path(Cell::new(2, 2), Cell::new(2, 2), &grid).is_empty());
        assert!(find_path(Cell::new(-1, 0), Cell::new(0, 0), &grid).is_empty());
        assert!(find_path(Cell::new(0, 0), Cell::new(5, 0), &grid).is_empty());
    }

    #[test]
    fn routes_around_wall_through_single_gap() {
        let mut grid = open_grid(7, 5);
        for y in 0..4 {
            grid.blocked.insert(Cell::new(3, y));
        }
        let path = find_path(Cell::new(1, 2), Cell::new(5, 2), &grid);
        assert!(!path.is_empty());
        assert!(path.contains(&Cell::new(3, 4)));
        for cell in &path {
            assert!(!grid.blocked.contains(cell), "stepped onto {cell:?}");
        }
        assert_four_connected(&path);
        // 4 across plus 2 up and 2 down to reach the gap row.
        assert_eq!(path.len(), 9);
    }

    #[test]
    fn unreachable_goal_returns_empty() {
        let mut grid = open_grid(5, 5);
        for cell in neighbors_4(Cell::new(4, 4)) {
            grid.blocked.insert(cell);
        }
        assert!(find_path(Cell::new(0, 0), Cell::new(4, 4), &grid).is_empty());
    }

    #[test]
    fn tie_break_is_deterministic_on_symmetric_map() {
        let mut grid = open_grid(5, 5);
        grid.blocked.insert(Cell::new(2, 2));
        let first = find_path(Cell::new(0, 2), Cell::new(4, 2), &grid);
        let second = find_path(Cell::new(0, 2), Cell::new(4, 2), &grid);
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
    }

    fn bfs_distance(start: Cell, goal: Cell, grid: &GridSpec) -> Option<usize> {
        let mut seen = HashSet::from([start]);
        let mut frontier = std::collections::VecDeque::from([(start, 0usize)]);
        while let Some((cell, dist)) = frontier.pop_front() {
            if cell == goal {
                return Some(dist);
            }
            for next in neighbors_4(cell) {
                if grid.is_walkable(next) && seen.insert(next) {
                    frontier.push_back((next, dist + 1));
                }
            }
        }
        None
    }

    fn seeded_obstacle_grid(seed: u64, width: u32, height: u32) -> GridSpec {
        let mut state = seed;
        let mut blocked = HashSet::new();
        for cell in crate::world::iter_cells(width, height) {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            if (state >> 33) % 10 < 3 {
                blocked.insert(cell);
            }
        }
        GridSpec::new(width, height, blocked)
    }

    #[test]
    fn path_lengths_match_breadth_first_search_on_seeded_maps() {
        let mut reachable_pairs = 0;
        for seed in 1..=8u64 {
            let grid = seeded_obstacle_grid(seed, 12, 9);
            let walkable = crate::world::iter_cells(12, 9)
                .filter(|cell| grid.is_walkable(*cell))
                .collect::<Vec<_>>();
            for (i, start) in walkable.iter().enumerate().step_by(3) {
                for goal in walkable.iter().skip(i % 5).step_by(7) {
                    let path = find_path(*start, *goal, &grid);
                    match bfs_distance(*start, *goal, &grid) {
                        Some(dist) => {
                            reachable_pairs += 1;
                            assert_eq!(path.len(), dist + 1, "seed {seed}: {start:?} -> {goal:?}");
                            assert_eq!(path.first(), Some(start));
                            assert_eq!(path.last(), Some(goal));
                            assert!(path.iter().all(|cell| grid.is_walkable(*cell)));
                            assert_four_connected(&path);
                        }
                        None => assert!(path.is_empty(), "seed {seed}: {start:?} -> {goal:?}"),
                    }
                }
            }
        }
        assert!(reachable_pairs > 100, "only {reachable_pairs} reachable pairs");
    }

    #[test]
    fn query_does_not_mutate_grid() {
        let mut grid = open_grid(6, 6);
        grid.blocked.insert(Cell::new(3, 3));
        let before = grid.clone();
        let _ = find_path(Cell::new(0, 0), Cell::new(5, 5), &grid);
        assert_eq!(grid, before);
    }
}
