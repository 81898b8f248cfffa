use anyhow::Context;
use std::path::Path;
use vbconvert_core::orchestrator::Orchestrator;

use super::convert::{report, AgentArgs, RunExit};
use crate::executor::ClaudeExecutor;

pub fn run(config_path: &Path, number: u32, args: AgentArgs, json: bool) -> anyhow::Result<()> {
    let entity = super::require_entity(args.entity.as_deref())?;
    let config = super::load_config(config_path)?;
    let options = args.run_options(entity)?;
    let orchestrator = Orchestrator::new(&config, &args.output_root(&config), options)?;

    let mut executor = ClaudeExecutor::new(&config, &args)?;
    let summary = orchestrator
        .run_single(number, &mut executor)
        .with_context(|| format!("step {number} of '{entity}' aborted"))?;

    report(&summary, json)?;
    match RunExit::from_summary(&summary) {
        Some(exit) => Err(exit.into()),
        None => Ok(()),
    }
}
