use anyhow::Context;
use claude_agent::{FlagSet, PermissionMode, StreamFormat};
use clap::Args;
use std::path::{Path, PathBuf};
use vbconvert_core::config::Config;
use vbconvert_core::orchestrator::{Orchestrator, RunOptions, RunSummary};
use vbconvert_core::steps;

use crate::executor::ClaudeExecutor;
use crate::output::print_json;

// ---------------------------------------------------------------------------
// RunExit: typed non-zero exit codes, resolved in main
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RunExit {
    StepFailed { step: u32, name: String, code: i32 },
    Interrupted { step: u32, code: i32 },
}

impl RunExit {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunExit::StepFailed { code, .. } | RunExit::Interrupted { code, .. } => *code,
        }
    }

    pub fn from_summary(summary: &RunSummary) -> Option<Self> {
        let failed = summary.failed?;
        let code = summary.exit_code();
        Some(if failed.interrupted {
            RunExit::Interrupted {
                step: failed.number,
                code,
            }
        } else {
            let name = summary
                .status
                .step(failed.number)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            RunExit::StepFailed {
                step: failed.number,
                name,
                code,
            }
        })
    }
}

impl std::fmt::Display for RunExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunExit::StepFailed { step, name, code } => {
                write!(f, "step {step} ({name}) failed with exit code {code}")
            }
            RunExit::Interrupted { step, .. } => write!(f, "interrupted during step {step}"),
        }
    }
}

impl std::error::Error for RunExit {}

// ---------------------------------------------------------------------------
// AgentArgs
// ---------------------------------------------------------------------------

/// Flags shared by `convert` and `step`.
#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    /// Entity name, e.g. Facility
    #[arg(long)]
    pub entity: Option<String>,

    /// Output root (default: outputDir from the config)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Attach claude to the terminal instead of running with --print
    #[arg(long)]
    pub interactive: bool,

    /// Legacy form name; a name not shaped like frm<Entity>Search/Detail selects single-form mode
    #[arg(long)]
    pub form_name: Option<String>,

    /// Comma-separated step numbers to mark skipped, e.g. 1,2,5 or 3-5
    #[arg(long)]
    pub skip_steps: Option<String>,

    /// Ignore recorded progress and start from step 1
    #[arg(long)]
    pub fresh: bool,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub permission_mode: Option<PermissionMode>,

    #[arg(long)]
    pub session_id: Option<String>,

    #[arg(long)]
    pub output_format: Option<StreamFormat>,

    #[arg(long)]
    pub input_format: Option<StreamFormat>,

    /// Extra directories claude may read
    #[arg(long = "add-dir", num_args = 1..)]
    pub add_dir: Vec<PathBuf>,

    /// Any further flags are forwarded to claude unchanged
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    pub passthrough: Vec<String>,
}

impl AgentArgs {
    /// Flags the user asked for, layered over the per-step base flags.
    pub fn user_flags(&self) -> FlagSet {
        let mut flags = FlagSet::new();
        if let Some(model) = &self.model {
            flags.set("model", model.as_str());
        }
        if let Some(mode) = self.permission_mode {
            flags.set("permission-mode", mode.as_str());
        }
        if let Some(id) = &self.session_id {
            flags.set("session-id", id.as_str());
        }
        if let Some(f) = self.output_format {
            flags.set("output-format", f.as_str());
        }
        if let Some(f) = self.input_format {
            flags.set("input-format", f.as_str());
        }
        flags.merge(&FlagSet::parse_passthrough(&self.passthrough))
    }

    pub fn output_root(&self, config: &Config) -> PathBuf {
        super::output_root(config, self.output.as_deref())
    }

    pub fn run_options(&self, entity: &str) -> anyhow::Result<RunOptions> {
        let skip_steps = match &self.skip_steps {
            Some(raw) => steps::parse_step_list(raw)?,
            None => Default::default(),
        };
        Ok(RunOptions {
            entity: entity.to_string(),
            form_name: self.form_name.clone(),
            skip_steps,
            fresh: self.fresh,
        })
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, args: AgentArgs, json: bool) -> anyhow::Result<()> {
    let entity = super::require_entity(args.entity.as_deref())?;
    let config = super::load_config(config_path)?;
    let options = args.run_options(entity)?;
    let orchestrator = Orchestrator::new(&config, &args.output_root(&config), options)?;

    let mut executor = ClaudeExecutor::new(&config, &args)?;
    let summary = orchestrator
        .run(&mut executor)
        .with_context(|| format!("conversion of '{entity}' aborted"))?;

    report(&summary, json)?;
    match RunExit::from_summary(&summary) {
        Some(exit) => Err(exit.into()),
        None => Ok(()),
    }
}

pub fn report(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&summary.status);
    }
    let status = &summary.status;
    println!(
        "{}: {} ({} mode) {}/{} steps completed, {} skipped",
        status.entity,
        status.overall_status,
        summary.mode,
        status.completed_steps,
        status.total_steps,
        status.skipped_steps
    );
    if !summary.already_complete.is_empty() {
        println!("  already complete: {}", join(&summary.already_complete));
    }
    if !summary.skipped.is_empty() {
        println!("  skipped: {}", join(&summary.skipped));
    }
    if !summary.executed.is_empty() {
        println!("  executed: {}", join(&summary.executed));
    }
    Ok(())
}

fn join(steps: &[u32]) -> String {
    steps
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
