use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod agent;
pub mod app;
pub mod content;
pub mod world;

pub use agent::{
    ActionError, CraftError, CraftProgress, CraftTick, Crafter, Inventory, ItemCounts, Npc,
    NpcDescriptor,
};
pub use app::{
    apply_command, run_headless, run_headless_in, AgentSummary, AppError, CommandError,
    LoopConfig, RunSummary, Script, ScriptCommand, ScriptEntry, REALTIME_ENV_VAR, SCRIPT_ENV_VAR,
    TICKS_ENV_VAR,
};
pub use content::{
    build_recipe_registry, build_world, load_recipes, load_world, ContentError, Recipe, RecipeId,
    RecipeRegistry, WorldDef,
};
pub use world::{
    cell_center, find_path, manhattan, neighbors_4, to_cell, AgentId, Area, AreaError, AreaIndex,
    AreaKind, AreaStyle, Cell, CellRect, GridMover, GridSpec, LedgerError, ObjectId, ObjectLedger,
    Vec2, World, WorldObject, WorldState,
};

pub const ROOT_ENV_VAR: &str = "NPC_SIM_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
}

/// Why the runner could not locate its project root or content.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{var} is not readable: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("cannot locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("executable {0} sits at the filesystem root; cannot search for the simulation root")]
    ExeHasNoParent(PathBuf),
    #[error("{var}={path} is not a simulation root (expected Cargo.toml next to crates/ or assets/)")]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
    #[error("no simulation root above {searched_from}; point {var} at the checkout holding assets/")]
    RootNotFound {
        searched_from: PathBuf,
        var: &'static str,
    },
    #[error("simulation root has no assets directory at {0}")]
    MissingAssets(PathBuf),
}

/// Locates the project root and its `assets/` directory.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => root_from_env(Path::new(&value))?,
        Err(env::VarError::NotPresent) => root_from_exe()?,
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    let assets_dir = root.join("assets");
    if !assets_dir.is_dir() {
        return Err(StartupError::MissingAssets(assets_dir));
    }
    Ok(AppPaths { root, assets_dir })
}

fn root_from_env(value: &Path) -> Result<PathBuf, StartupError> {
    let path = canonical_or_raw(value);
    if !is_sim_root(&path) {
        return Err(StartupError::InvalidEnvRoot {
            var: ROOT_ENV_VAR,
            path,
        });
    }
    Ok(path)
}

fn root_from_exe() -> Result<PathBuf, StartupError> {
    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let Some(exe_dir) = exe.parent() else {
        return Err(StartupError::ExeHasNoParent(exe.clone()));
    };
    find_sim_root(exe_dir).ok_or_else(|| StartupError::RootNotFound {
        searched_from: canonical_or_raw(exe_dir),
        var: ROOT_ENV_VAR,
    })
}

/// Nearest ancestor of `start` (inclusive) that looks like a simulation root.
fn find_sim_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_sim_root(candidate))
        .map(canonical_or_raw)
}

fn is_sim_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file()
        && (path.join("crates").is_dir() || path.join("assets").is_dir())
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
