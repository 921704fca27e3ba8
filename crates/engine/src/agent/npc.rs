use thiserror::Error;
use tracing::{info, warn};

use crate::world::{
    find_path, manhattan, to_cell, AgentId, Cell, GridMover, LedgerError, Vec2, WorldState,
    DEFAULT_SPEED_CELLS_PER_SECOND,
};

use super::crafting::{CraftError, CraftProgress, CraftTick, Crafter};
use super::inventory::{Inventory, ItemCounts};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("target {target:?} is too far from {from:?}")]
    TooFar { from: Cell, target: Cell },
    #[error("not holding {qty} x '{item}'")]
    MissingItems { item: String, qty: u32 },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("ledger commit failed after validation: {0}")]
    CommitFailed(#[source] LedgerError),
    #[error(transparent)]
    Craft(#[from] CraftError),
}

/// What a loader needs to place an agent in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct NpcDescriptor {
    pub id: AgentId,
    pub cell: Cell,
    pub speed_cells_per_second: f32,
    pub known_recipes: Vec<String>,
    pub inventory: ItemCounts,
}

impl NpcDescriptor {
    pub fn new(id: impl Into<String>, cell: Cell) -> Self {
        Self {
            id: AgentId(id.into()),
            cell,
            speed_cells_per_second: DEFAULT_SPEED_CELLS_PER_SECOND,
            known_recipes: Vec::new(),
            inventory: ItemCounts::new(),
        }
    }
}

/// One autonomous agent: movement, carried items and a crafting slot.
///
/// Actions borrow the shared [`WorldState`]; nothing here holds on to it
/// between calls.
#[derive(Debug, Clone)]
pub struct Npc {
    id: AgentId,
    mover: GridMover,
    inventory: Inventory,
    crafter: Crafter,
}

impl Npc {
    pub fn new(descriptor: NpcDescriptor, state: &WorldState) -> Self {
        let mut npc = Self {
            id: descriptor.id,
            mover: GridMover::new(state.grid_size(), descriptor.speed_cells_per_second),
            inventory: Inventory::from_counts(&descriptor.inventory),
            crafter: Crafter::new(state.recipes().clone(), descriptor.known_recipes),
        };
        npc.spawn_at(descriptor.cell);
        npc
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn spawn_at(&mut self, cell: Cell) {
        self.mover.set_cell_position(cell);
        info!(agent = %self.id, cell = ?cell, "spawn_at");
    }

    /// Plans a route on the current world snapshot. On failure the agent
    /// stops where it is.
    pub fn move_to_cell(&mut self, goal: Cell, state: &WorldState) -> bool {
        let start = self.current_cell();
        info!(agent = %self.id, start = ?start, goal = ?goal, "move_request");
        let path = find_path(start, goal, &state.grid_spec());
        if path.is_empty() {
            warn!(agent = %self.id, start = ?start, goal = ?goal, "no_path");
            self.mover.clear_path();
            return false;
        }
        let steps = path.len();
        self.mover.set_path(path);
        info!(agent = %self.id, start = ?start, goal = ?goal, steps, "path_set");
        true
    }

    pub fn move_to_point(&mut self, point: Vec2, state: &WorldState) -> bool {
        self.move_to_cell(to_cell(point, state.grid_size()), state)
    }

    pub fn stop(&mut self) {
        self.mover.clear_path();
        info!(agent = %self.id, "stop");
    }

    /// Picks the ground object at `cell` into the inventory and returns its
    /// type name.
    pub fn pick_from_ground(
        &mut self,
        cell: Cell,
        type_filter: Option<&str>,
        state: &mut WorldState,
    ) -> Result<String, ActionError> {
        self.ensure_reachable(cell)?;
        let id = state.ledger().can_pick(cell, type_filter)?;
        let type_name = state
            .ledger()
            .object(id)
            .map(|object| object.type_name.clone())
            .ok_or(LedgerError::ObjectNotFound { id })?;

        self.inventory.add_one(&type_name, 1);
        if let Err(err) = state.ledger_mut().commit_pick(&self.id, id) {
            self.inventory.remove_one(&type_name, 1);
            warn!(agent = %self.id, cell = ?cell, error = %err, "pickup_commit_failed");
            return Err(ActionError::CommitFailed(err));
        }
        info!(agent = %self.id, cell = ?cell, item = %type_name, "pick_from_ground");
        Ok(type_name)
    }

    /// Drops `qty` of `item` on `cell`; returns how many ground objects were
    /// created.
    pub fn drop_to_ground(
        &mut self,
        item: &str,
        qty: u32,
        cell: Cell,
        state: &mut WorldState,
    ) -> Result<usize, ActionError> {
        self.ensure_reachable(cell)?;
        if self.inventory.count(item) < qty {
            return Err(ActionError::MissingItems {
                item: item.to_string(),
                qty,
            });
        }
        state.ledger().can_drop(cell, qty, &state.grid_spec())?;

        self.inventory.remove_one(item, qty);
        match state.ledger_mut().commit_drop(&self.id, cell, item, qty) {
            Ok(created) => {
                info!(agent = %self.id, cell = ?cell, item, qty, "drop_to_ground");
                Ok(created.len())
            }
            Err(err) => {
                self.inventory.add_one(item, qty);
                warn!(agent = %self.id, cell = ?cell, error = %err, "drop_commit_failed");
                Err(ActionError::CommitFailed(err))
            }
        }
    }

    pub fn start_craft(
        &mut self,
        recipe_name: &str,
        qty: u32,
        state: &mut WorldState,
    ) -> Result<(), ActionError> {
        let kinds_here = state.areas().kinds_at(self.current_cell());
        let consumed = match self
            .crafter
            .start(recipe_name, qty, &kinds_here, &mut self.inventory)
        {
            Ok(recipe) => recipe.inputs_for(qty),
            Err(err) => {
                warn!(agent = %self.id, recipe = recipe_name, qty, error = %err, "craft_rejected");
                return Err(err.into());
            }
        };
        for (item, count) in &consumed {
            state.ledger_mut().retire_held(&self.id, item, *count);
        }
        info!(agent = %self.id, recipe = recipe_name, qty, "craft_start");
        Ok(())
    }

    pub fn cancel_craft(&mut self) -> bool {
        let cancelled = self.crafter.cancel();
        if cancelled {
            info!(agent = %self.id, "craft_cancel");
        }
        cancelled
    }

    pub fn learn_recipe(&mut self, recipe_name: &str) -> bool {
        self.crafter.learn(recipe_name)
    }

    /// Movement first, then crafting, so station checks see where the agent
    /// ended up this tick.
    pub fn update(&mut self, dt_seconds: f32, state: &mut WorldState) {
        let prev_cell = self.current_cell();
        let had_target = self.mover.target_cell().is_some();
        self.mover.update(dt_seconds);
        let cell = self.current_cell();
        if cell != prev_cell {
            info!(agent = %self.id, from = ?prev_cell, to = ?cell, "step");
        }
        if had_target && self.mover.is_idle() {
            info!(agent = %self.id, cell = ?cell, "arrived");
        }

        let kinds_here = state.areas().kinds_at(cell);
        let recipe = self.crafter.progress().map(|progress| progress.recipe);
        match self
            .crafter
            .update(dt_seconds, &kinds_here, &mut self.inventory)
        {
            CraftTick::Idle | CraftTick::Progressed { units_completed: 0 } => {}
            CraftTick::Progressed { units_completed } => {
                info!(agent = %self.id, recipe = ?recipe, units_completed, "craft_progress");
            }
            CraftTick::Completed { units_completed } => {
                info!(agent = %self.id, recipe = ?recipe, units_completed, "craft_complete");
            }
            CraftTick::LeftStation => {
                warn!(agent = %self.id, recipe = ?recipe, cell = ?cell, "craft_cancel_left_station");
            }
        }
    }

    pub fn current_cell(&self) -> Cell {
        self.mover.current_cell()
    }

    pub fn world_position(&self) -> Vec2 {
        self.mover.world_position()
    }

    pub fn is_idle(&self) -> bool {
        self.mover.is_idle()
    }

    pub fn target_cell(&self) -> Option<Cell> {
        self.mover.target_cell()
    }

    pub fn path_cells(&self) -> &[Cell] {
        self.mover.path()
    }

    pub fn craft_progress(&self) -> Option<CraftProgress> {
        self.crafter.progress()
    }

    pub fn is_crafting(&self) -> bool {
        self.crafter.is_active()
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_snapshot(&self) -> ItemCounts {
        self.inventory.snapshot()
    }

    fn ensure_reachable(&self, target: Cell) -> Result<(), ActionError> {
        let from = self.current_cell();
        if manhattan(from, target) > 1 {
            return Err(ActionError::TooFar { from, target });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::content::{Recipe, RecipeId, RecipeRegistry};
    use crate::world::{cell_center, Area, AreaKind, CellRect, World};

    fn counts(entries: &[(&str, u32)]) -> ItemCounts {
        entries
            .iter()
            .map(|(item, qty)| (item.to_string(), *qty))
            .collect()
    }

    fn registry() -> Arc<RecipeRegistry> {
        Arc::new(RecipeRegistry::from_recipes(vec![Recipe {
            id: RecipeId(0),
            name: "bread".to_string(),
            inputs: counts(&[("wheat", 2)]),
            outputs: counts(&[("bread", 1)]),
            time_per_unit: 2.0,
            station: Some(AreaKind::Bakery),
        }]))
    }

    /// 12x12 world with a bakery walled in on x 4..8, y 4..8 and a door at (5,4).
    fn bakery_state() -> WorldState {
        let mut state = WorldState::new(12, 12, 10.0, registry());
        let rect = CellRect::new(4, 4, 8, 8).expect("rect");
        let bakery = Area::new("bakery1", AreaKind::Bakery, vec![rect], [Cell::new(5, 4)], None)
            .expect("area");
        state.areas_mut().add(bakery).expect("add");
        state
    }

    fn baker(cell: Cell, wheat: u32, state: &WorldState) -> Npc {
        let mut descriptor = NpcDescriptor::new("eldric", cell);
        descriptor.known_recipes = vec!["bread".to_string()];
        descriptor.inventory = counts(&[("wheat", wheat)]);
        Npc::new(descriptor, state)
    }

    fn run_until_idle(npc: &mut Npc, state: &mut WorldState) {
        for _ in 0..1_000 {
            if npc.is_idle() {
                return;
            }
            npc.update(0.05, state);
        }
        panic!("agent never became idle");
    }

    #[test]
    fn spawns_on_cell_center() {
        let state = bakery_state();
        let npc = baker(Cell::new(1, 2), 0, &state);
        assert_eq!(npc.current_cell(), Cell::new(1, 2));
        assert_eq!(npc.world_position(), cell_center(Cell::new(1, 2), 10.0));
        assert!(npc.is_idle());
        assert!(npc.target_cell().is_none());
    }

    #[test]
    fn walks_into_bakery_through_the_door() {
        let mut state = bakery_state();
        let mut npc = baker(Cell::new(5, 1), 0, &state);
        assert!(npc.move_to_cell(Cell::new(5, 6), &state));
        assert_eq!(npc.path_cells().len(), 6);
        assert!(npc.path_cells().contains(&Cell::new(5, 4)));

        run_until_idle(&mut npc, &mut state);
        assert_eq!(npc.current_cell(), Cell::new(5, 6));
        assert_eq!(npc.world_position(), cell_center(Cell::new(5, 6), 10.0));
    }

    #[test]
    fn unreachable_goal_stops_agent() {
        let mut state = bakery_state();
        state.set_blocked(Cell::new(5, 3));
        let mut npc = baker(Cell::new(5, 1), 0, &state);
        assert!(!npc.move_to_cell(Cell::new(5, 6), &state));
        assert!(npc.is_idle());
        assert!(npc.path_cells().is_empty());
        assert!(!npc.move_to_cell(Cell::new(4, 4), &state));
    }

    #[test]
    fn move_to_point_targets_containing_cell() {
        let state = bakery_state();
        let mut npc = baker(Cell::new(0, 0), 0, &state);
        assert!(npc.move_to_point(Vec2 { x: 29.0, y: 11.0 }, &state));
        assert_eq!(npc.path_cells().last(), Some(&Cell::new(2, 1)));
        npc.stop();
        assert!(npc.is_idle());
    }

    #[test]
    fn pick_moves_object_into_inventory() {
        let mut state = bakery_state();
        let id = state
            .ledger_mut()
            .spawn("wheat", Cell::new(1, 0))
            .expect("spawn");
        let mut npc = baker(Cell::new(0, 0), 0, &state);

        let item = npc
            .pick_from_ground(Cell::new(1, 0), Some("wheat"), &mut state)
            .expect("pick");
        assert_eq!(item, "wheat");
        assert_eq!(npc.inventory().count("wheat"), 1);
        assert!(state.ledger().ground_object_at(Cell::new(1, 0)).is_none());
        assert_eq!(
            state.ledger().object(id).and_then(|o| o.held_by.clone()),
            Some(npc.id().clone())
        );
    }

    #[test]
    fn pick_and_drop_enforce_proximity() {
        let mut state = bakery_state();
        state
            .ledger_mut()
            .spawn("wheat", Cell::new(2, 1))
            .expect("spawn");
        let mut npc = baker(Cell::new(0, 0), 3, &state);

        assert_eq!(
            npc.pick_from_ground(Cell::new(2, 1), None, &mut state),
            Err(ActionError::TooFar {
                from: Cell::new(0, 0),
                target: Cell::new(2, 1)
            })
        );
        assert!(matches!(
            npc.drop_to_ground("wheat", 1, Cell::new(1, 1), &mut state),
            Err(ActionError::TooFar { .. })
        ));
        assert_eq!(npc.inventory().count("wheat"), 3);
    }

    #[test]
    fn pick_reports_ledger_validation_errors() {
        let mut state = bakery_state();
        state.ledger_mut().spawn("gem", Cell::new(0, 1)).expect("spawn");
        let mut npc = baker(Cell::new(0, 0), 0, &state);

        assert_eq!(
            npc.pick_from_ground(Cell::new(1, 0), None, &mut state),
            Err(ActionError::Ledger(LedgerError::NoObject {
                cell: Cell::new(1, 0)
            }))
        );
        assert!(matches!(
            npc.pick_from_ground(Cell::new(0, 1), Some("wheat"), &mut state),
            Err(ActionError::Ledger(LedgerError::TypeMismatch { .. }))
        ));
        assert!(npc.inventory().is_empty());
    }

    #[test]
    fn drop_puts_one_object_on_the_ground() {
        let mut state = bakery_state();
        let mut npc = baker(Cell::new(0, 0), 2, &state);

        assert_eq!(npc.drop_to_ground("wheat", 1, Cell::new(0, 1), &mut state), Ok(1));
        assert_eq!(npc.inventory().count("wheat"), 1);
        assert_eq!(
            state
                .ledger()
                .ground_object_at(Cell::new(0, 1))
                .map(|o| o.type_name.as_str()),
            Some("wheat")
        );

        assert!(matches!(
            npc.drop_to_ground("wheat", 1, Cell::new(0, 1), &mut state),
            Err(ActionError::Ledger(LedgerError::CellOccupied { .. }))
        ));
        assert_eq!(
            npc.drop_to_ground("bread", 1, Cell::new(1, 0), &mut state),
            Err(ActionError::MissingItems {
                item: "bread".to_string(),
                qty: 1
            })
        );
        assert_eq!(npc.inventory().count("wheat"), 1);
    }

    #[test]
    fn drop_on_blocked_cell_is_rejected() {
        let mut state = bakery_state();
        state.set_blocked(Cell::new(1, 0));
        let mut npc = baker(Cell::new(0, 0), 1, &state);
        assert_eq!(
            npc.drop_to_ground("wheat", 1, Cell::new(1, 0), &mut state),
            Err(ActionError::Ledger(LedgerError::CellBlocked {
                cell: Cell::new(1, 0)
            }))
        );
        assert_eq!(npc.inventory().count("wheat"), 1);
    }

    #[test]
    fn stacked_drop_is_rejected_before_touching_inventory() {
        let mut state = bakery_state();
        let mut npc = baker(Cell::new(0, 0), 3, &state);
        for qty in [2, 0] {
            assert_eq!(
                npc.drop_to_ground("wheat", qty, Cell::new(1, 0), &mut state),
                Err(ActionError::Ledger(LedgerError::QuantityNotOne { qty }))
            );
        }
        assert_eq!(npc.inventory().count("wheat"), 3);
        assert!(state.ledger().is_empty());
    }

    #[test]
    fn craft_outside_station_is_rejected() {
        let mut state = bakery_state();
        let mut npc = baker(Cell::new(1, 1), 4, &state);
        assert!(matches!(
            npc.start_craft("bread", 1, &mut state),
            Err(ActionError::Craft(CraftError::WrongStation { .. }))
        ));
        assert_eq!(npc.inventory().count("wheat"), 4);
        assert!(!npc.is_crafting());
    }

    #[test]
    fn crafts_inside_bakery_and_retires_held_inputs() {
        let mut state = bakery_state();
        for cell in [Cell::new(5, 5), Cell::new(6, 6)] {
            state.ledger_mut().spawn("wheat", cell).expect("spawn");
        }
        let mut npc = baker(Cell::new(5, 6), 0, &state);
        npc.pick_from_ground(Cell::new(5, 5), None, &mut state)
            .expect("pick first");
        npc.pick_from_ground(Cell::new(6, 6), None, &mut state)
            .expect("pick second");
        assert_eq!(state.ledger().held_by(npc.id()).count(), 2);

        npc.start_craft("bread", 1, &mut state).expect("start");
        assert_eq!(npc.inventory().count("wheat"), 0);
        assert_eq!(state.ledger().held_by(npc.id()).count(), 0);

        npc.update(1.0, &mut state);
        let progress = npc.craft_progress().expect("progress");
        assert_eq!(progress.recipe, "bread");
        assert_eq!(progress.units_done, 0);
        npc.update(1.0, &mut state);
        assert!(npc.craft_progress().is_none());
        assert_eq!(npc.inventory_snapshot(), counts(&[("bread", 1)]));
    }

    #[test]
    fn walking_out_of_bakery_cancels_craft() {
        let mut state = bakery_state();
        let mut npc = baker(Cell::new(5, 5), 4, &state);
        npc.start_craft("bread", 2, &mut state).expect("start");
        assert!(npc.move_to_cell(Cell::new(5, 2), &state));

        run_until_idle(&mut npc, &mut state);
        npc.update(0.05, &mut state);
        assert!(!npc.is_crafting());
        assert_eq!(npc.inventory().count("bread"), 0);
        assert_eq!(npc.inventory().count("wheat"), 0);
    }

    #[test]
    fn cancel_craft_keeps_inputs_consumed() {
        let mut state = bakery_state();
        let mut npc = baker(Cell::new(6, 6), 2, &state);
        npc.start_craft("bread", 1, &mut state).expect("start");
        assert!(npc.cancel_craft());
        assert!(!npc.cancel_craft());
        assert!(npc.inventory().is_empty());
    }

    #[test]
    fn world_tick_updates_every_agent() {
        let mut world = World::new(bakery_state());
        let first = baker(Cell::new(0, 0), 0, world.state());
        let mut second_descriptor = NpcDescriptor::new("mara", Cell::new(0, 2));
        second_descriptor.speed_cells_per_second = 2.0;
        let second = Npc::new(second_descriptor, world.state());
        assert!(world.add_agent(first.clone()));
        assert!(world.add_agent(second));
        assert!(!world.add_agent(first));

        for id in ["eldric", "mara"] {
            let (agent, state) = world
                .agent_and_state_mut(&AgentId::from(id))
                .expect("agent");
            assert!(agent.move_to_cell(Cell::new(3, agent.current_cell().y), state));
        }
        for _ in 0..20 {
            world.tick(0.05);
        }
        let eldric = world.agent(&AgentId::from("eldric")).expect("eldric");
        let mara = world.agent(&AgentId::from("mara")).expect("mara");
        assert_eq!(eldric.current_cell(), Cell::new(3, 0));
        assert!(eldric.is_idle());
        assert_eq!(mara.current_cell(), Cell::new(2, 2));
        assert!(!mara.is_idle());
    }
}
