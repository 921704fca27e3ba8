use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use super::grid::Cell;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AreaKind {
    #[default]
    Generic,
    Bakery,
    Bar,
    Farm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaStyle {
    pub fill_rgb: (u8, u8, u8),
    pub border_rgb: (u8, u8, u8),
    pub fill_alpha: u8,
    pub border_alpha: u8,
}

const AREA_STYLES: [(AreaKind, AreaStyle); 4] = [
    (
        AreaKind::Generic,
        AreaStyle {
            fill_rgb: (180, 180, 180),
            border_rgb: (120, 120, 120),
            fill_alpha: 50,
            border_alpha: 180,
        },
    ),
    (
        AreaKind::Bakery,
        AreaStyle {
            fill_rgb: (255, 165, 0),
            border_rgb: (200, 120, 0),
            fill_alpha: 50,
            border_alpha: 200,
        },
    ),
    (
        AreaKind::Bar,
        AreaStyle {
            fill_rgb: (90, 200, 255),
            border_rgb: (20, 120, 200),
            fill_alpha: 50,
            border_alpha: 200,
        },
    ),
    (
        AreaKind::Farm,
        AreaStyle {
            fill_rgb: (140, 220, 120),
            border_rgb: (60, 140, 60),
            fill_alpha: 50,
            border_alpha: 200,
        },
    ),
];

impl AreaKind {
    pub const ALL: [AreaKind; 4] = [Self::Generic, Self::Bakery, Self::Bar, Self::Farm];

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Bakery => "bakery",
            Self::Bar => "bar",
            Self::Farm => "farm",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_token().eq_ignore_ascii_case(token))
    }

    pub fn style(self) -> AreaStyle {
        AREA_STYLES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, style)| *style)
            .unwrap_or(AREA_STYLES[0].1)
    }
}

/// Half-open cell rectangle: covers `left..right` by `bottom..top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    left: i32,
    bottom: i32,
    right: i32,
    top: i32,
}

impl CellRect {
    pub fn new(left: i32, bottom: i32, right: i32, top: i32) -> Result<Self, AreaError> {
        let rect = Self {
            left,
            bottom,
            right,
            top,
        };
        rect.validate()
    }

    fn validate(self) -> Result<Self, AreaError> {
        if self.right <= self.left || self.top <= self.bottom {
            return Err(AreaError::MalformedRect { rect: self });
        }
        Ok(self)
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    pub fn right(&self) -> i32 {
        self.right
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.left && cell.x < self.right && cell.y >= self.bottom && cell.y < self.top
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.bottom..self.top).flat_map(move |y| (self.left..self.right).map(move |x| Cell::new(x, y)))
    }

    /// Outermost ring of cells, bottom row first, then top row, then the
    /// remaining left/right column cells.
    pub fn boundary_cells(&self) -> Vec<Cell> {
        let last_x = self.right - 1;
        let last_y = self.top - 1;
        let mut out = Vec::new();
        for y in [self.bottom, last_y] {
            for x in self.left..self.right {
                out.push(Cell::new(x, y));
            }
            if last_y == self.bottom {
                break;
            }
        }
        for y in (self.bottom + 1)..last_y {
            out.push(Cell::new(self.left, y));
            if last_x != self.left {
                out.push(Cell::new(last_x, y));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AreaError {
    #[error("area id cannot be empty")]
    EmptyId,
    #[error("area '{id}' has no rectangles")]
    NoRects { id: String },
    #[error("malformed rectangle {rect:?}: right/top must exceed left/bottom")]
    MalformedRect { rect: CellRect },
    #[error("duplicate area id '{id}'")]
    DuplicateId { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    id: String,
    kind: AreaKind,
    rects: Vec<CellRect>,
    entrances: HashSet<Cell>,
    anchor: Option<Cell>,
}

impl Area {
    pub fn new(
        id: impl Into<String>,
        kind: AreaKind,
        rects: Vec<CellRect>,
        entrances: impl IntoIterator<Item = Cell>,
        anchor: Option<Cell>,
    ) -> Result<Self, AreaError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AreaError::EmptyId);
        }
        if rects.is_empty() {
            return Err(AreaError::NoRects { id });
        }
        for rect in &rects {
            rect.validate()?;
        }
        Ok(Self {
            id,
            kind,
            rects,
            entrances: entrances.into_iter().collect(),
            anchor,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> AreaKind {
        self.kind
    }

    pub fn rects(&self) -> &[CellRect] {
        &self.rects
    }

    pub fn entrances(&self) -> &HashSet<Cell> {
        &self.entrances
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.rects.iter().any(|rect| rect.contains(cell))
    }

    pub fn perimeter_cells(&self) -> Vec<Cell> {
        let mut seen = HashSet::new();
        self.rects
            .iter()
            .flat_map(CellRect::boundary_cells)
            .filter(|cell| seen.insert(*cell))
            .collect()
    }

    /// Perimeter minus entrances: the cells that wall the area off.
    pub fn perimeter_block_cells(&self) -> Vec<Cell> {
        self.perimeter_cells()
            .into_iter()
            .filter(|cell| !self.entrances.contains(cell))
            .collect()
    }

    pub fn bbox(&self) -> CellRect {
        let mut bbox = self.rects[0];
        for rect in &self.rects[1..] {
            bbox.left = bbox.left.min(rect.left);
            bbox.bottom = bbox.bottom.min(rect.bottom);
            bbox.right = bbox.right.max(rect.right);
            bbox.top = bbox.top.max(rect.top);
        }
        bbox
    }

    /// Where a label for this area goes: the anchor, or the discrete center of
    /// the bounding box.
    pub fn label_cell(&self) -> Cell {
        if let Some(anchor) = self.anchor {
            return anchor;
        }
        let bbox = self.bbox();
        Cell::new(
            (bbox.left + bbox.right - 1).div_euclid(2),
            (bbox.bottom + bbox.top - 1).div_euclid(2),
        )
    }
}

/// Named rectangular zones with an O(1) cell lookup.
///
/// On overlap the most recently inserted area owns the cell for `area_at`;
/// `areas_for_cell` lists every containing area in insertion order.
#[derive(Debug, Default)]
pub struct AreaIndex {
    areas: Vec<Area>,
    positions: HashMap<String, usize>,
    cell_to_areas: HashMap<Cell, Vec<String>>,
    perimeter_cache: OnceCell<HashSet<Cell>>,
}

impl AreaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_areas(areas: impl IntoIterator<Item = Area>) -> Result<Self, AreaError> {
        let mut index = Self::new();
        for area in areas {
            index.add(area)?;
        }
        Ok(index)
    }

    pub fn add(&mut self, area: Area) -> Result<(), AreaError> {
        if self.area(area.id()).is_some() {
            return Err(AreaError::DuplicateId {
                id: area.id().to_string(),
            });
        }
        debug!(
            area_id = area.id(),
            kind = area.kind().as_token(),
            rects = area.rects().len(),
            "area_added"
        );
        Self::index_area(&mut self.cell_to_areas, &area);
        self.positions.insert(area.id().to_string(), self.areas.len());
        self.areas.push(area);
        self.perimeter_cache = OnceCell::new();
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Area> {
        let position = *self.positions.get(id)?;
        let removed = self.areas.remove(position);
        debug!(area_id = id, "area_removed");
        self.rebuild_index();
        Some(removed)
    }

    pub fn rebuild_index(&mut self) {
        self.cell_to_areas.clear();
        self.positions.clear();
        for (position, area) in self.areas.iter().enumerate() {
            Self::index_area(&mut self.cell_to_areas, area);
            self.positions.insert(area.id().to_string(), position);
        }
        self.perimeter_cache = OnceCell::new();
    }

    fn index_area(cell_to_areas: &mut HashMap<Cell, Vec<String>>, area: &Area) {
        let mut seen = HashSet::new();
        for rect in area.rects() {
            for cell in rect.cells() {
                if seen.insert(cell) {
                    cell_to_areas
                        .entry(cell)
                        .or_default()
                        .push(area.id().to_string());
                }
            }
        }
    }

    pub fn area(&self, id: &str) -> Option<&Area> {
        self.positions
            .get(id)
            .and_then(|position| self.areas.get(*position))
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn area_at(&self, cell: Cell) -> Option<&Area> {
        let id = self.cell_to_areas.get(&cell)?.last()?;
        self.area(id)
    }

    pub fn areas_for_cell(&self, cell: Cell) -> &[String] {
        self.cell_to_areas
            .get(&cell)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn kinds_at(&self, cell: Cell) -> Vec<AreaKind> {
        let mut kinds = Vec::new();
        for id in self.areas_for_cell(cell) {
            if let Some(area) = self.area(id) {
                if !kinds.contains(&area.kind()) {
                    kinds.push(area.kind());
                }
            }
        }
        kinds
    }

    pub fn by_kind(&self, kind: AreaKind) -> Vec<&str> {
        self.areas
            .iter()
            .filter(|area| area.kind() == kind)
            .map(Area::id)
            .collect()
    }

    /// Union of every area's perimeter minus its own entrances. Cached until
    /// the next mutation.
    pub fn perimeter_blocked_cells(&self) -> &HashSet<Cell> {
        self.perimeter_cache.get_or_init(|| {
            self.areas
                .iter()
                .flat_map(Area::perimeter_block_cells)
                .collect()
        })
    }
}
