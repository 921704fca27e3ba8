use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for Cell {
    fn from(value: [i32; 2]) -> Self {
        Self {
            x: value[0],
            y: value[1],
        }
    }
}

impl From<Cell> for [i32; 2] {
    fn from(value: Cell) -> Self {
        [value.x, value.y]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Grid convention:
/// - cell (0,0) has its bottom-left corner at world (0,0).
/// - the center of cell (x,y) is `((x + 0.5) * grid_size, (y + 0.5) * grid_size)`.
pub fn to_cell(position: Vec2, grid_size: f32) -> Cell {
    Cell {
        x: (position.x / grid_size).floor() as i32,
        y: (position.y / grid_size).floor() as i32,
    }
}

pub fn cell_center(cell: Cell, grid_size: f32) -> Vec2 {
    Vec2 {
        x: (cell.x as f32 + 0.5) * grid_size,
        y: (cell.y as f32 + 0.5) * grid_size,
    }
}

/// North, east, south, west.
pub fn neighbors_4(cell: Cell) -> [Cell; 4] {
    [
        Cell::new(cell.x, cell.y + 1),
        Cell::new(cell.x + 1, cell.y),
        Cell::new(cell.x, cell.y - 1),
        Cell::new(cell.x - 1, cell.y),
    ]
}

pub fn in_bounds(cell: Cell, width: u32, height: u32) -> bool {
    cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < width && (cell.y as u32) < height
}

pub fn manhattan(a: Cell, b: Cell) -> u32 {
    a.x.abs_diff(b.x).saturating_add(a.y.abs_diff(b.y))
}

pub fn iter_cells(width: u32, height: u32) -> impl Iterator<Item = Cell> {
    (0..height as i32).flat_map(move |y| (0..width as i32).map(move |x| Cell::new(x, y)))
}
