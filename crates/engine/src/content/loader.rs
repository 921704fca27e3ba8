use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::agent::{Npc, NpcDescriptor};
use crate::world::{in_bounds, AgentId, Area, AreaError, AreaKind, CellRect, World, WorldState};

use super::database::{Recipe, RecipeId, RecipeRegistry};
use super::types::{AreaDef, ContentError, RecipeFile, WorldDef};

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let raw = fs::read_to_string(path).map_err(|source| ContentError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json(&raw, path)
}

fn parse_json<T: DeserializeOwned>(raw: &str, path: &Path) -> Result<T, ContentError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ContentError::Parse {
            path: path.to_path_buf(),
            json_path,
            message: error.into_inner().to_string(),
        }
    })
}

pub fn load_recipes(path: &Path) -> Result<RecipeRegistry, ContentError> {
    let file: RecipeFile = read_json_file(path)?;
    let registry = build_recipe_registry(file)?;
    info!(path = %path.display(), recipes = registry.len(), "recipes_loaded");
    Ok(registry)
}

pub fn build_recipe_registry(file: RecipeFile) -> Result<RecipeRegistry, ContentError> {
    let mut recipes = Vec::with_capacity(file.len());
    for (name, def) in file {
        let invalid = |message: String| ContentError::InvalidRecipe {
            recipe: name.clone(),
            message,
        };
        if name.trim().is_empty() {
            return Err(invalid("recipe name cannot be empty".to_string()));
        }
        if !def.time_per_unit.is_finite() || def.time_per_unit <= 0.0 {
            return Err(invalid(format!(
                "time_per_unit must be finite and > 0, got {}",
                def.time_per_unit
            )));
        }
        if def.outputs.values().all(|qty| *qty == 0) {
            return Err(invalid("recipe produces nothing".to_string()));
        }
        let station = match def.station.as_deref() {
            None => None,
            Some(token) => Some(
                AreaKind::from_token(token)
                    .ok_or_else(|| invalid(format!("unknown station kind '{token}'")))?,
            ),
        };
        recipes.push(Recipe {
            id: RecipeId(0),
            name,
            inputs: def.inputs,
            outputs: def.outputs,
            time_per_unit: def.time_per_unit,
            station,
        });
    }
    Ok(RecipeRegistry::from_recipes(recipes))
}

pub fn load_world(path: &Path, recipes: Arc<RecipeRegistry>) -> Result<World, ContentError> {
    let def: WorldDef = read_json_file(path)?;
    let world = build_world(def, recipes)?;
    let state = world.state();
    info!(
        path = %path.display(),
        width = state.width(),
        height = state.height(),
        blocked = state.blocked().len(),
        areas = state.areas().len(),
        objects = state.ledger().len(),
        agents = world.agents().len(),
        "world_loaded"
    );
    Ok(world)
}

/// Builds the world from a parsed descriptor. Geometry, area and agent
/// problems are errors; objects that cannot be placed are skipped.
pub fn build_world(def: WorldDef, recipes: Arc<RecipeRegistry>) -> Result<World, ContentError> {
    if def.width == 0 || def.height == 0 {
        return Err(ContentError::InvalidWorld {
            message: format!("dimensions must be non-zero, got {}x{}", def.width, def.height),
        });
    }
    if !def.grid_size.is_finite() || def.grid_size <= 0.0 {
        return Err(ContentError::InvalidWorld {
            message: format!("grid_size must be finite and > 0, got {}", def.grid_size),
        });
    }

    let mut state = WorldState::new(def.width, def.height, def.grid_size, recipes);
    for cell in def.blocked {
        if !in_bounds(cell, def.width, def.height) {
            warn!(cell = ?cell, "blocked_cell_out_of_bounds");
        }
        state.set_blocked(cell);
    }

    for area_def in def.areas {
        let id = area_def.id.clone();
        let area = build_area(area_def).map_err(|source| ContentError::Area {
            id: id.clone(),
            source,
        })?;
        state
            .areas_mut()
            .add(area)
            .map_err(|source| ContentError::Area { id, source })?;
    }

    let grid = state.grid_spec();
    for object in def.objects {
        if !grid.is_walkable(object.cell) {
            warn!(
                type_name = %object.type_name,
                cell = ?object.cell,
                "object_skipped_unwalkable"
            );
            continue;
        }
        if let Err(err) = state.ledger_mut().spawn(&object.type_name, object.cell) {
            warn!(
                type_name = %object.type_name,
                cell = ?object.cell,
                error = %err,
                "object_skipped"
            );
        }
    }

    let mut world = World::new(state);
    for agent in def.agents {
        if !agent.speed.is_finite() || agent.speed <= 0.0 {
            return Err(ContentError::InvalidWorld {
                message: format!("agent '{}' speed must be finite and > 0", agent.id),
            });
        }
        if agent.id.trim().is_empty() {
            return Err(ContentError::InvalidWorld {
                message: "agent id cannot be empty".to_string(),
            });
        }
        if world.agent(&AgentId(agent.id.clone())).is_some() {
            return Err(ContentError::DuplicateAgent { id: agent.id });
        }
        for recipe in &agent.known_recipes {
            if world.state().recipes().get(recipe).is_none() {
                warn!(agent = %agent.id, recipe = %recipe, "known_recipe_missing");
            }
        }
        let descriptor = NpcDescriptor {
            id: AgentId(agent.id),
            cell: agent.cell,
            speed_cells_per_second: agent.speed,
            known_recipes: agent.known_recipes,
            inventory: agent.inventory,
        };
        let npc = Npc::new(descriptor, world.state());
        world.add_agent(npc);
    }
    Ok(world)
}

fn build_area(def: AreaDef) -> Result<Area, AreaError> {
    let kind = match def.kind.trim() {
        "" => AreaKind::Generic,
        token => AreaKind::from_token(token).unwrap_or_else(|| {
            warn!(area_id = %def.id, kind = token, "unknown_area_kind_fallback_generic");
            AreaKind::Generic
        }),
    };
    let rects = def
        .rects
        .iter()
        .map(|[left, bottom, right, top]| CellRect::new(*left, *bottom, *right, *top))
        .collect::<Result<Vec<_>, _>>()?;
    let entrances = def.entrances.iter().copied().collect::<HashSet<_>>();
    Area::new(def.id, kind, rects, entrances, def.anchor)
}
