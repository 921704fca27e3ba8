mod loop_runner;
mod script;

pub use loop_runner::{
    run_headless, run_headless_in, AgentSummary, AppError, LoopConfig, RunSummary,
    REALTIME_ENV_VAR, SCRIPT_ENV_VAR, TICKS_ENV_VAR,
};
pub use script::{apply_command, CommandError, Script, ScriptCommand, ScriptEntry};
