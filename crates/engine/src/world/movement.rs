use super::grid::{cell_center, to_cell, Cell, Vec2};

pub const DEFAULT_SPEED_CELLS_PER_SECOND: f32 = 4.0;

/// Walks a 4-connected cell path at a fixed speed, one axis at a time.
///
/// The position always lies on the segment between `path[index]` and
/// `path[index + 1]` (or on a cell center when idle). At most one waypoint is
/// reached per `update` call; leftover distance is discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMover {
    grid_size: f32,
    speed_cells_per_second: f32,
    path: Vec<Cell>,
    current_index: usize,
    position: Vec2,
}

impl GridMover {
    pub fn new(grid_size: f32, speed_cells_per_second: f32) -> Self {
        Self {
            grid_size,
            speed_cells_per_second,
            path: Vec::new(),
            current_index: 0,
            position: Vec2::default(),
        }
    }

    pub fn grid_size(&self) -> f32 {
        self.grid_size
    }

    pub fn speed_cells_per_second(&self) -> f32 {
        self.speed_cells_per_second
    }

    pub fn set_cell_position(&mut self, cell: Cell) {
        self.path.clear();
        self.current_index = 0;
        self.position = cell_center(cell, self.grid_size);
    }

    /// Replaces the route; `path[0]` is taken to be the cell the mover is on.
    pub fn set_path(&mut self, path: Vec<Cell>) {
        self.path = path;
        self.current_index = 0;
        if let Some(first) = self.path.first() {
            self.position = cell_center(*first, self.grid_size);
        }
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.current_index = 0;
    }

    pub fn is_idle(&self) -> bool {
        self.path.is_empty() || self.current_index >= self.path.len() - 1
    }

    pub fn world_position(&self) -> Vec2 {
        self.position
    }

    pub fn current_cell(&self) -> Cell {
        to_cell(self.position, self.grid_size)
    }

    pub fn target_cell(&self) -> Option<Cell> {
        if self.is_idle() {
            return None;
        }
        self.path.get(self.current_index + 1).copied()
    }

    pub fn path(&self) -> &[Cell] {
        &self.path
    }

    pub fn update(&mut self, dt_seconds: f32) {
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return;
        }
        let Some(target_cell) = self.target_cell() else {
            return;
        };

        let target = cell_center(target_cell, self.grid_size);
        let step = self.speed_cells_per_second * self.grid_size * dt_seconds;
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;

        if dx != 0.0 {
            self.position.x = approach(self.position.x, target.x, step);
        } else if dy != 0.0 {
            self.position.y = approach(self.position.y, target.y, step);
        }

        if self.position == target {
            self.current_index += 1;
        }
    }
}

fn approach(current: f32, target: f32, step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= step {
        target
    } else {
        current + step.copysign(delta)
    }
}
