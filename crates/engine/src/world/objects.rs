use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use super::grid::Cell;
use super::pathfinding::GridSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldObject {
    pub id: ObjectId,
    /// Only meaningful while `held_by` is `None`.
    pub cell: Cell,
    pub type_name: String,
    pub held_by: Option<AgentId>,
}

impl WorldObject {
    pub fn is_on_ground(&self) -> bool {
        self.held_by.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("no object on the ground at {cell:?}")]
    NoObject { cell: Cell },
    #[error("object at {cell:?} is '{found}', expected '{expected}'")]
    TypeMismatch {
        cell: Cell,
        expected: String,
        found: String,
    },
    #[error("cell {cell:?} is blocked by world geometry")]
    CellBlocked { cell: Cell },
    #[error("cell {cell:?} is already occupied by {occupant}")]
    CellOccupied { cell: Cell, occupant: ObjectId },
    #[error("object {id} not found")]
    ObjectNotFound { id: ObjectId },
    #[error("object {id} is already held by {holder}")]
    AlreadyHeld { id: ObjectId, holder: AgentId },
    #[error("quantity {qty} greater than one for single-object cell")]
    QuantityNotOne { qty: u32 },
    #[error("object type name cannot be empty")]
    EmptyTypeName,
}

#[derive(Debug, Default)]
struct ObjectIdAllocator {
    next: u64,
}

impl ObjectIdAllocator {
    fn allocate(&mut self) -> ObjectId {
        self.next = self.next.saturating_add(1);
        ObjectId(self.next)
    }
}

/// Authoritative record of world objects and ground occupancy.
///
/// Pick and drop are two-phase: `can_*` validates without mutating, `commit_*`
/// re-checks the occupancy invariant and applies. Callers that adjust their own
/// state between the phases must undo it themselves when a commit fails.
#[derive(Debug, Default)]
pub struct ObjectLedger {
    allocator: ObjectIdAllocator,
    objects: BTreeMap<ObjectId, WorldObject>,
    ground_by_cell: HashMap<Cell, ObjectId>,
}

impl ObjectLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader/editor entry point; skips the two-phase protocol but still keeps
    /// one object per cell.
    pub fn spawn(&mut self, type_name: &str, cell: Cell) -> Result<ObjectId, LedgerError> {
        if type_name.trim().is_empty() {
            return Err(LedgerError::EmptyTypeName);
        }
        if let Some(occupant) = self.ground_by_cell.get(&cell) {
            return Err(LedgerError::CellOccupied {
                cell,
                occupant: *occupant,
            });
        }
        let id = self.place_new(type_name, cell);
        debug!(object_id = %id, type_name, cell = ?cell, "object_spawned");
        Ok(id)
    }

    pub fn despawn(&mut self, id: ObjectId) -> Option<WorldObject> {
        let object = self.objects.remove(&id)?;
        if object.is_on_ground() {
            self.ground_by_cell.remove(&object.cell);
        }
        Some(object)
    }

    pub fn can_pick(&self, cell: Cell, type_filter: Option<&str>) -> Result<ObjectId, LedgerError> {
        let Some(id) = self.ground_by_cell.get(&cell).copied() else {
            return Err(LedgerError::NoObject { cell });
        };
        let object = self
            .objects
            .get(&id)
            .ok_or(LedgerError::ObjectNotFound { id })?;
        if let Some(expected) = type_filter {
            if object.type_name != expected {
                return Err(LedgerError::TypeMismatch {
                    cell,
                    expected: expected.to_string(),
                    found: object.type_name.clone(),
                });
            }
        }
        Ok(id)
    }

    pub fn commit_pick(&mut self, agent: &AgentId, id: ObjectId) -> Result<String, LedgerError> {
        let object = self
            .objects
            .get_mut(&id)
            .ok_or(LedgerError::ObjectNotFound { id })?;
        if let Some(holder) = &object.held_by {
            return Err(LedgerError::AlreadyHeld {
                id,
                holder: holder.clone(),
            });
        }
        if self.ground_by_cell.get(&object.cell) == Some(&id) {
            self.ground_by_cell.remove(&object.cell);
        }
        object.held_by = Some(agent.clone());
        info!(object_id = %id, agent = %agent, cell = ?object.cell, "pickup_ok");
        Ok(object.type_name.clone())
    }

    pub fn can_drop(&self, cell: Cell, qty: u32, grid: &GridSpec) -> Result<(), LedgerError> {
        if qty != 1 {
            return Err(LedgerError::QuantityNotOne { qty });
        }
        if !grid.is_walkable(cell) {
            return Err(LedgerError::CellBlocked { cell });
        }
        if let Some(occupant) = self.ground_by_cell.get(&cell) {
            return Err(LedgerError::CellOccupied {
                cell,
                occupant: *occupant,
            });
        }
        Ok(())
    }

    /// Puts `qty` objects of `type_name` on `cell`. A matching object already
    /// held by `agent` is put down first; otherwise a new object is minted.
    pub fn commit_drop(
        &mut self,
        agent: &AgentId,
        cell: Cell,
        type_name: &str,
        qty: u32,
    ) -> Result<Vec<ObjectId>, LedgerError> {
        if qty != 1 {
            return Err(LedgerError::QuantityNotOne { qty });
        }
        if type_name.trim().is_empty() {
            return Err(LedgerError::EmptyTypeName);
        }
        if let Some(occupant) = self.ground_by_cell.get(&cell) {
            return Err(LedgerError::CellOccupied {
                cell,
                occupant: *occupant,
            });
        }

        let reused = self
            .objects
            .values_mut()
            .find(|object| object.held_by.as_ref() == Some(agent) && object.type_name == type_name);
        let id = match reused {
            Some(object) => {
                object.held_by = None;
                object.cell = cell;
                self.ground_by_cell.insert(cell, object.id);
                object.id
            }
            None => self.place_new(type_name, cell),
        };
        info!(object_id = %id, agent = %agent, cell = ?cell, type_name, "drop_ok");
        Ok(vec![id])
    }

    /// Forgets up to `qty` records of `type_name` held by `agent`, e.g. after
    /// they were consumed as crafting inputs. Returns how many were removed.
    pub fn retire_held(&mut self, agent: &AgentId, type_name: &str, qty: u32) -> u32 {
        let doomed = self
            .objects
            .values()
            .filter(|object| object.held_by.as_ref() == Some(agent) && object.type_name == type_name)
            .map(|object| object.id)
            .take(qty as usize)
            .collect::<Vec<_>>();
        for id in &doomed {
            self.objects.remove(id);
        }
        doomed.len() as u32
    }

    pub fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    pub fn ground_object_at(&self, cell: Cell) -> Option<&WorldObject> {
        self.ground_by_cell
            .get(&cell)
            .and_then(|id| self.objects.get(id))
    }

    pub fn held_by<'a>(&'a self, agent: &'a AgentId) -> impl Iterator<Item = &'a WorldObject> + 'a {
        self.objects
            .values()
            .filter(move |object| object.held_by.as_ref() == Some(agent))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn ground_count(&self) -> usize {
        self.ground_by_cell.len()
    }

    fn place_new(&mut self, type_name: &str, cell: Cell) -> ObjectId {
        let id = self.allocator.allocate();
        self.objects.insert(
            id,
            WorldObject {
                id,
                cell,
                type_name: type_name.to_string(),
                held_by: None,
            },
        );
        self.ground_by_cell.insert(cell, id);
        id
    }
}
