use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::agent::{ActionError, Npc};
use crate::content::{read_json_file, ContentError};
use crate::world::{AgentId, Cell, World, WorldState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptCommand {
    MoveTo {
        cell: Cell,
    },
    Stop,
    Pick {
        cell: Cell,
        #[serde(default)]
        type_filter: Option<String>,
    },
    Drop {
        item: String,
        #[serde(default = "one")]
        qty: u32,
        cell: Cell,
    },
    Craft {
        recipe: String,
        #[serde(default = "one")]
        qty: u32,
    },
    CancelCraft,
    Block {
        cell: Cell,
    },
    Unblock {
        cell: Cell,
    },
    ClearBlocks,
}

impl ScriptCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MoveTo { .. } => "move_to",
            Self::Stop => "stop",
            Self::Pick { .. } => "pick",
            Self::Drop { .. } => "drop",
            Self::Craft { .. } => "craft",
            Self::CancelCraft => "cancel_craft",
            Self::Block { .. } => "block",
            Self::Unblock { .. } => "unblock",
            Self::ClearBlocks => "clear_blocks",
        }
    }
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptEntry {
    pub tick: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub command: ScriptCommand,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("command '{command}' needs an agent")]
    MissingAgent { command: &'static str },
    #[error("unknown agent '{id}'")]
    UnknownAgent { id: String },
    #[error("no path to {cell:?}")]
    NoPath { cell: Cell },
    #[error("no active craft to cancel")]
    NothingToCancel,
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Scripted commands ordered by tick; entries sharing a tick keep file order.
#[derive(Debug, Clone, Default)]
pub struct Script {
    entries: Vec<ScriptEntry>,
    cursor: usize,
}

impl Script {
    pub fn new(mut entries: Vec<ScriptEntry>) -> Self {
        entries.sort_by_key(|entry| entry.tick);
        Self { entries, cursor: 0 }
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let entries: Vec<ScriptEntry> = read_json_file(path)?;
        info!(path = %path.display(), entries = entries.len(), "script_loaded");
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries scheduled at or before `tick` that have not been handed out yet.
    pub fn take_due(&mut self, tick: u64) -> &[ScriptEntry] {
        let start = self.cursor;
        while self
            .entries
            .get(self.cursor)
            .is_some_and(|entry| entry.tick <= tick)
        {
            self.cursor += 1;
        }
        &self.entries[start..self.cursor]
    }

    pub fn remaining(&self) -> usize {
        self.entries.len() - self.cursor
    }
}

pub fn apply_command(world: &mut World, entry: &ScriptEntry) -> Result<(), CommandError> {
    match &entry.command {
        ScriptCommand::Block { cell } => {
            world.state_mut().set_blocked(*cell);
        }
        ScriptCommand::Unblock { cell } => {
            world.state_mut().clear_blocked(*cell);
        }
        ScriptCommand::ClearBlocks => {
            world.state_mut().clear_all_blocked();
        }
        ScriptCommand::MoveTo { cell } => {
            let (agent, state) = agent_for(world, entry)?;
            if !agent.move_to_cell(*cell, state) {
                return Err(CommandError::NoPath { cell: *cell });
            }
        }
        ScriptCommand::Stop => {
            let (agent, _) = agent_for(world, entry)?;
            agent.stop();
        }
        ScriptCommand::Pick { cell, type_filter } => {
            let (agent, state) = agent_for(world, entry)?;
            agent.pick_from_ground(*cell, type_filter.as_deref(), state)?;
        }
        ScriptCommand::Drop { item, qty, cell } => {
            let (agent, state) = agent_for(world, entry)?;
            agent.drop_to_ground(item, *qty, *cell, state)?;
        }
        ScriptCommand::Craft { recipe, qty } => {
            let (agent, state) = agent_for(world, entry)?;
            agent.start_craft(recipe, *qty, state)?;
        }
        ScriptCommand::CancelCraft => {
            let (agent, _) = agent_for(world, entry)?;
            if !agent.cancel_craft() {
                return Err(CommandError::NothingToCancel);
            }
        }
    }
    Ok(())
}

fn agent_for<'w>(
    world: &'w mut World,
    entry: &ScriptEntry,
) -> Result<(&'w mut Npc, &'w mut WorldState), CommandError> {
    let id = entry.agent.as_deref().ok_or(CommandError::MissingAgent {
        command: entry.command.name(),
    })?;
    world
        .agent_and_state_mut(&AgentId::from(id))
        .ok_or_else(|| CommandError::UnknownAgent { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::agent::NpcDescriptor;
    use crate::content::RecipeRegistry;

    fn entries(value: serde_json::Value) -> Vec<ScriptEntry> {
        serde_json::from_value(value).expect("script")
    }

    fn small_world() -> World {
        let state = WorldState::new(8, 8, 10.0, Arc::new(RecipeRegistry::default()));
        let mut world = World::new(state);
        let npc = Npc::new(NpcDescriptor::new("eldric", Cell::new(0, 0)), world.state());
        world.add_agent(npc);
        world
    }

    #[test]
    fn parses_tagged_commands_with_defaults() {
        let parsed = entries(json!([
            {"tick": 5, "agent": "eldric", "command": {"type": "drop", "item": "wheat", "cell": [1, 0]}},
            {"tick": 0, "command": {"type": "clear_blocks"}},
            {"tick": 2, "agent": "eldric", "command": {"type": "craft", "recipe": "bread", "qty": 3}}
        ]));
        assert_eq!(
            parsed[0].command,
            ScriptCommand::Drop {
                item: "wheat".to_string(),
                qty: 1,
                cell: Cell::new(1, 0)
            }
        );
        assert_eq!(parsed[1].agent, None);
        assert_eq!(parsed[2].command.name(), "craft");
    }

    #[test]
    fn take_due_hands_out_entries_in_tick_order_once() {
        let mut script = Script::new(entries(json!([
            {"tick": 3, "command": {"type": "clear_blocks"}},
            {"tick": 0, "agent": "a", "command": {"type": "stop"}},
            {"tick": 3, "agent": "a", "command": {"type": "cancel_craft"}}
        ])));
        assert_eq!(script.take_due(0).len(), 1);
        assert!(script.take_due(2).is_empty());
        let due = script.take_due(5);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].command, ScriptCommand::ClearBlocks);
        assert_eq!(due[1].command, ScriptCommand::CancelCraft);
        assert_eq!(script.remaining(), 0);
    }

    #[test]
    fn world_commands_edit_blocked_cells() {
        let mut world = small_world();
        for entry in entries(json!([
            {"tick": 0, "command": {"type": "block", "cell": [3, 3]}},
            {"tick": 0, "command": {"type": "block", "cell": [4, 3]}},
            {"tick": 0, "command": {"type": "unblock", "cell": [3, 3]}}
        ])) {
            apply_command(&mut world, &entry).expect("apply");
        }
        assert_eq!(world.state().blocked().len(), 1);
        assert!(world.state().blocked().contains(&Cell::new(4, 3)));
    }

    #[test]
    fn agent_commands_report_failures() {
        let mut world = small_world();
        let cases = entries(json!([
            {"tick": 0, "command": {"type": "stop"}},
            {"tick": 0, "agent": "ghost", "command": {"type": "stop"}},
            {"tick": 0, "agent": "eldric", "command": {"type": "move_to", "cell": [20, 20]}},
            {"tick": 0, "agent": "eldric", "command": {"type": "cancel_craft"}},
            {"tick": 0, "agent": "eldric", "command": {"type": "pick", "cell": [5, 5]}}
        ]));
        let results = cases
            .iter()
            .map(|entry| apply_command(&mut world, entry))
            .collect::<Vec<_>>();
        assert_eq!(results[0], Err(CommandError::MissingAgent { command: "stop" }));
        assert_eq!(
            results[1],
            Err(CommandError::UnknownAgent {
                id: "ghost".to_string()
            })
        );
        assert_eq!(
            results[2],
            Err(CommandError::NoPath {
                cell: Cell::new(20, 20)
            })
        );
        assert_eq!(results[3], Err(CommandError::NothingToCancel));
        assert!(matches!(
            results[4],
            Err(CommandError::Action(ActionError::TooFar { .. }))
        ));
    }

    #[test]
    fn move_to_plans_a_route() {
        let mut world = small_world();
        let entry = entries(json!([
            {"tick": 0, "agent": "eldric", "command": {"type": "move_to", "cell": [3, 0]}}
        ]))
        .remove(0);
        apply_command(&mut world, &entry).expect("move");
        let agent = world.agent(&AgentId::from("eldric")).expect("agent");
        assert_eq!(agent.path_cells().len(), 4);
    }
}
