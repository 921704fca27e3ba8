mod areas;
mod grid;
mod movement;
mod objects;
mod pathfinding;
mod state;

pub use areas::{Area, AreaError, AreaIndex, AreaKind, AreaStyle, CellRect};
pub use grid::{cell_center, in_bounds, iter_cells, manhattan, neighbors_4, to_cell, Cell, Vec2};
pub use movement::{GridMover, DEFAULT_SPEED_CELLS_PER_SECOND};
pub use objects::{AgentId, LedgerError, ObjectId, ObjectLedger, WorldObject};
pub use pathfinding::{find_path, GridSpec};
pub use state::{World, WorldState};
