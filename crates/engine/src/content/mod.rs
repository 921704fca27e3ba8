mod database;
mod loader;
mod types;

pub use database::{Recipe, RecipeId, RecipeRegistry};
pub use loader::{build_recipe_registry, build_world, load_recipes, load_world, read_json_file};
pub use types::{
    AgentDef, AreaDef, ContentError, ObjectDef, RecipeDef, RecipeFile, WorldDef, DEFAULT_GRID_SIZE,
};
