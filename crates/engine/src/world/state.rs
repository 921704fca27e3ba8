use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::agent::Npc;
use crate::content::RecipeRegistry;

use super::areas::AreaIndex;
use super::grid::Cell;
use super::objects::{AgentId, ObjectLedger};
use super::pathfinding::GridSpec;

/// Shared world data every agent action borrows: geometry, areas, ground
/// objects and the recipe table.
#[derive(Debug)]
pub struct WorldState {
    width: u32,
    height: u32,
    grid_size: f32,
    blocked: HashSet<Cell>,
    areas: AreaIndex,
    ledger: ObjectLedger,
    recipes: Arc<RecipeRegistry>,
}

impl WorldState {
    pub fn new(width: u32, height: u32, grid_size: f32, recipes: Arc<RecipeRegistry>) -> Self {
        Self {
            width,
            height,
            grid_size,
            blocked: HashSet::new(),
            areas: AreaIndex::new(),
            ledger: ObjectLedger::new(),
            recipes,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn grid_size(&self) -> f32 {
        self.grid_size
    }

    pub fn blocked(&self) -> &HashSet<Cell> {
        &self.blocked
    }

    pub fn set_blocked(&mut self, cell: Cell) -> bool {
        let inserted = self.blocked.insert(cell);
        if inserted {
            debug!(cell = ?cell, "cell_blocked");
        }
        inserted
    }

    pub fn clear_blocked(&mut self, cell: Cell) -> bool {
        let removed = self.blocked.remove(&cell);
        if removed {
            debug!(cell = ?cell, "cell_unblocked");
        }
        removed
    }

    pub fn clear_all_blocked(&mut self) -> usize {
        let count = self.blocked.len();
        self.blocked.clear();
        debug!(count, "blocked_cells_cleared");
        count
    }

    /// Snapshot for a path query: explicit blocks plus area walls.
    pub fn grid_spec(&self) -> GridSpec {
        let mut blocked = self.blocked.clone();
        blocked.extend(self.areas.perimeter_blocked_cells().iter().copied());
        GridSpec::new(self.width, self.height, blocked)
    }

    pub fn areas(&self) -> &AreaIndex {
        &self.areas
    }

    pub fn areas_mut(&mut self) -> &mut AreaIndex {
        &mut self.areas
    }

    pub fn ledger(&self) -> &ObjectLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ObjectLedger {
        &mut self.ledger
    }

    pub fn recipes(&self) -> &Arc<RecipeRegistry> {
        &self.recipes
    }
}

/// The world plus its agents. Ticks agents one after another so ledger and
/// area mutations never interleave.
#[derive(Debug)]
pub struct World {
    state: WorldState,
    agents: Vec<Npc>,
}

impl World {
    pub fn new(state: WorldState) -> Self {
        Self {
            state,
            agents: Vec::new(),
        }
    }

    /// Returns false (and keeps the existing agent) when the id is taken.
    pub fn add_agent(&mut self, agent: Npc) -> bool {
        if self.agent(agent.id()).is_some() {
            return false;
        }
        self.agents.push(agent);
        true
    }

    pub fn agent(&self, id: &AgentId) -> Option<&Npc> {
        self.agents.iter().find(|agent| agent.id() == id)
    }

    pub fn agent_mut(&mut self, id: &AgentId) -> Option<&mut Npc> {
        self.agents.iter_mut().find(|agent| agent.id() == id)
    }

    /// Splits the borrow so an agent action can mutate the shared state.
    pub fn agent_and_state_mut(&mut self, id: &AgentId) -> Option<(&mut Npc, &mut WorldState)> {
        let agent = self.agents.iter_mut().find(|agent| agent.id() == id)?;
        Some((agent, &mut self.state))
    }

    pub fn agents(&self) -> &[Npc] {
        &self.agents
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    /// One logical step: every agent moves, then crafts, in insertion order.
    pub fn tick(&mut self, dt_seconds: f32) {
        for agent in &mut self.agents {
            agent.update(dt_seconds, &mut self.state);
        }
    }
}
