use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::ItemCounts;
use crate::world::{AreaError, Cell, DEFAULT_SPEED_CELLS_PER_SECOND};

pub const DEFAULT_GRID_SIZE: f32 = 24.0;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path} at {json_path}: {message}")]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("recipe '{recipe}': {message}")]
    InvalidRecipe { recipe: String, message: String },
    #[error("world: {message}")]
    InvalidWorld { message: String },
    #[error("area '{id}': {source}")]
    Area {
        id: String,
        #[source]
        source: AreaError,
    },
    #[error("duplicate agent id '{id}'")]
    DuplicateAgent { id: String },
}

/// One entry of `recipes.json`, keyed by recipe name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeDef {
    #[serde(default)]
    pub inputs: ItemCounts,
    #[serde(default)]
    pub outputs: ItemCounts,
    pub time_per_unit: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
}

pub type RecipeFile = BTreeMap<String, RecipeDef>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldDef {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_grid_size")]
    pub grid_size: f32,
    #[serde(default)]
    pub blocked: Vec<Cell>,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
    #[serde(default)]
    pub areas: Vec<AreaDef>,
    #[serde(default)]
    pub agents: Vec<AgentDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectDef {
    #[serde(rename = "type")]
    pub type_name: String,
    pub cell: Cell,
}

/// `rects` entries are `[left, bottom, right, top]`, right/top exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaDef {
    pub id: String,
    #[serde(default)]
    pub kind: String,
    pub rects: Vec<[i32; 4]>,
    #[serde(default)]
    pub entrances: Vec<Cell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentDef {
    pub id: String,
    pub cell: Cell,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub known_recipes: Vec<String>,
    #[serde(default)]
    pub inventory: ItemCounts,
}

fn default_grid_size() -> f32 {
    DEFAULT_GRID_SIZE
}

fn default_speed() -> f32 {
    DEFAULT_SPEED_CELLS_PER_SECOND
}
