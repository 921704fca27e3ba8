use std::process::ExitCode;

use npc_engine::run_headless;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_headless(app.config) {
        Ok(summary) => {
            let crafting = summary
                .agents
                .iter()
                .filter(|agent| agent.craft.is_some())
                .count();
            info!(
                ticks = summary.ticks,
                agents = summary.agents.len(),
                crafting,
                commands_failed = summary.commands_failed,
                "shutdown"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
