use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::agent::{CraftProgress, ItemCounts};
use crate::content::{load_recipes, load_world, ContentError};
use crate::world::{Cell, World};
use crate::{resolve_app_paths, StartupError};

use super::script::{apply_command, Script};

pub const TICKS_ENV_VAR: &str = "NPC_SIM_TICKS";
pub const REALTIME_ENV_VAR: &str = "NPC_SIM_REALTIME";
pub const SCRIPT_ENV_VAR: &str = "NPC_SIM_SCRIPT";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_ticks: u64,
    /// Pace ticks against the wall clock instead of running flat out.
    pub realtime: bool,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    /// Relative paths resolve against the assets directory.
    pub world_file: PathBuf,
    pub recipes_file: PathBuf,
    pub script_file: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: 600,
            realtime: false,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            world_file: PathBuf::from("world.json"),
            recipes_file: PathBuf::from("recipes.json"),
            script_file: Some(PathBuf::from("script.json")),
        }
    }
}

impl LoopConfig {
    /// Defaults overridden by `NPC_SIM_TICKS`, `NPC_SIM_REALTIME` and
    /// `NPC_SIM_SCRIPT`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let script_file = match env::var(SCRIPT_ENV_VAR) {
            Ok(value) if value.trim().is_empty() || value.trim() == "none" => None,
            Ok(value) => Some(PathBuf::from(value.trim())),
            Err(_) => defaults.script_file.clone(),
        };
        Self {
            max_ticks: env_override(TICKS_ENV_VAR, defaults.max_ticks),
            realtime: env_override(REALTIME_ENV_VAR, defaults.realtime),
            script_file,
            ..defaults
        }
    }
}

fn env_override<T: FromStr + Copy>(var: &'static str, fallback: T) -> T {
    match env::var(var) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    env_var = var,
                    value = value.as_str(),
                    "invalid env var value; falling back to default"
                );
                fallback
            }
        },
        Err(env::VarError::NotPresent) => fallback,
        Err(err) => {
            warn!(env_var = var, error = %err, "unable to read env var; falling back to default");
            fallback
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load content: {0}")]
    Content(#[from] ContentError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentSummary {
    pub id: String,
    pub cell: Cell,
    pub idle: bool,
    pub inventory: ItemCounts,
    pub craft: Option<CraftProgress>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub sim_seconds: f64,
    pub commands_applied: usize,
    pub commands_failed: usize,
    pub ground_objects: usize,
    pub agents: Vec<AgentSummary>,
}

impl RunSummary {
    pub fn agent(&self, id: &str) -> Option<&AgentSummary> {
        self.agents.iter().find(|agent| agent.id == id)
    }
}

pub fn run_headless(config: LoopConfig) -> Result<RunSummary, AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        "startup"
    );
    run_headless_in(&config, &app_paths.assets_dir)
}

pub fn run_headless_in(config: &LoopConfig, assets_dir: &Path) -> Result<RunSummary, AppError> {
    let recipes = Arc::new(load_recipes(&assets_dir.join(&config.recipes_file))?);
    let mut world = load_world(&assets_dir.join(&config.world_file), recipes)?;
    let mut script = match &config.script_file {
        Some(file) => Script::load(&assets_dir.join(file))?,
        None => Script::default(),
    };

    let target_tps = config.target_tps.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    info!(
        target_tps,
        max_ticks = config.max_ticks,
        realtime = config.realtime,
        script_entries = script.len(),
        "loop_config"
    );

    let mut stepper = Stepper {
        world: &mut world,
        script: &mut script,
        fixed_dt_seconds,
        tick: 0,
        commands_applied: 0,
        commands_failed: 0,
    };

    if config.realtime {
        let max_frame_delta = normalize_non_zero_duration(config.max_frame_delta, fixed_dt);
        let mut accumulator = Duration::ZERO;
        let mut last_frame_instant = Instant::now();
        while stepper.tick < config.max_ticks {
            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            for _ in 0..step_plan.ticks_to_run {
                if stepper.tick >= config.max_ticks {
                    break;
                }
                stepper.step();
            }
            accumulator = step_plan.remaining_accumulator;
            if step_plan.dropped_backlog > Duration::ZERO {
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }
            thread::sleep(fixed_dt.saturating_sub(accumulator));
        }
    } else {
        while stepper.tick < config.max_ticks {
            stepper.step();
        }
    }

    let ticks = stepper.tick;
    let commands_applied = stepper.commands_applied;
    let commands_failed = stepper.commands_failed;
    if script.remaining() > 0 {
        warn!(remaining = script.remaining(), ticks, "script_entries_unreached");
    }

    let summary = summarize(&world, ticks, fixed_dt_seconds, commands_applied, commands_failed);
    for agent in &summary.agents {
        info!(
            agent = %agent.id,
            cell = ?agent.cell,
            idle = agent.idle,
            inventory = ?agent.inventory,
            craft = ?agent.craft,
            "agent_summary"
        );
    }
    info!(
        ticks,
        sim_seconds = summary.sim_seconds,
        commands_applied,
        commands_failed,
        ground_objects = summary.ground_objects,
        "run_complete"
    );
    Ok(summary)
}

struct Stepper<'a> {
    world: &'a mut World,
    script: &'a mut Script,
    fixed_dt_seconds: f32,
    tick: u64,
    commands_applied: usize,
    commands_failed: usize,
}

impl Stepper<'_> {
    /// Applies commands due this tick, then advances the world once.
    fn step(&mut self) {
        for entry in self.script.take_due(self.tick) {
            match apply_command(self.world, entry) {
                Ok(()) => {
                    self.commands_applied += 1;
                }
                Err(err) => {
                    self.commands_failed += 1;
                    warn!(
                        tick = self.tick,
                        agent = ?entry.agent,
                        command = entry.command.name(),
                        error = %err,
                        "script_command_failed"
                    );
                }
            }
        }
        self.world.tick(self.fixed_dt_seconds);
        self.tick += 1;
    }
}

fn summarize(
    world: &World,
    ticks: u64,
    fixed_dt_seconds: f32,
    commands_applied: usize,
    commands_failed: usize,
) -> RunSummary {
    RunSummary {
        ticks,
        sim_seconds: ticks as f64 * fixed_dt_seconds as f64,
        commands_applied,
        commands_failed,
        ground_objects: world.state().ledger().ground_count(),
        agents: world
            .agents()
            .iter()
            .map(|agent| AgentSummary {
                id: agent.id().to_string(),
                cell: agent.current_cell(),
                idle: agent.is_idle(),
                inventory: agent.inventory_snapshot(),
                craft: agent.craft_progress(),
            })
            .collect(),
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn clamp_frame_delta(raw_frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    raw_frame_dt.min(max_frame_delta)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(mut accumulator: Duration, fixed_dt: Duration, max_ticks_per_frame: u32) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}
