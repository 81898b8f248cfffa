//! `StepExecutor` over the `claude` CLI.

use anyhow::Context;
use claude_agent::{run_step, FlagSet, PermissionMode, StepInvocation};
use std::path::PathBuf;
use vbconvert_core::config::Config;
use vbconvert_core::orchestrator::{StepExecutor, StepOutcome, StepRequest};
use vbconvert_core::paths::{self, ProjectKind};
use vbconvert_core::ConvertError;

use crate::cmd::convert::AgentArgs;

pub struct ClaudeExecutor {
    runtime: tokio::runtime::Runtime,
    executable: PathBuf,
    project_root: PathBuf,
    project_root_env: String,
    settings: serde_json::Value,
    mcp_config: Option<String>,
    permission_mode: Option<PermissionMode>,
    model: Option<String>,
    add_dirs: Vec<PathBuf>,
    interactive: bool,
    user_flags: FlagSet,
}

impl ClaudeExecutor {
    pub fn new(config: &Config, args: &AgentArgs) -> anyhow::Result<Self> {
        let binary = &config.claude.binary;
        let executable = which::which(binary)
            .with_context(|| format!("claude binary '{binary}' not found on PATH"))?;

        let permission_mode = config
            .claude
            .permission_mode
            .as_deref()
            .map(str::parse::<PermissionMode>)
            .transpose()
            .context("invalid claude.permissionMode in config")?;

        let project_root = std::fs::canonicalize(&config.root).unwrap_or_else(|_| config.root.clone());

        let mut add_dirs = vec![
            config.input_root(),
            args.output_root(config),
            paths::project_root(config, ProjectKind::Reference),
        ];
        add_dirs.extend(args.add_dir.iter().cloned());

        let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;

        Ok(Self {
            runtime,
            executable,
            project_root,
            project_root_env: config.claude.project_root_env.clone(),
            settings: config.claude.settings.clone(),
            mcp_config: config.claude.mcp_config.clone(),
            permission_mode,
            model: config.claude.model.clone(),
            add_dirs,
            interactive: args.interactive,
            user_flags: args.user_flags(),
        })
    }

    fn invocation(&self, request: &StepRequest<'_>) -> StepInvocation {
        let log_file = paths::logs_dir(request.entity_dir)
            .join(format!("{:02}-{}.log", request.step.number, request.step.key));
        StepInvocation {
            step_name: request.step.key.to_string(),
            prompt: request.prompt.user.clone(),
            system_prompt: request.prompt.system.clone(),
            settings: self.settings.clone(),
            mcp_config: self.mcp_config.clone(),
            permission_mode: self.permission_mode,
            model: self.model.clone(),
            add_dirs: self.add_dirs.clone(),
            interactive: self.interactive,
            user_flags: self.user_flags.clone(),
            executable: self.executable.clone(),
            project_root: self.project_root.clone(),
            project_root_env: self.project_root_env.clone(),
            log_file: Some(log_file),
        }
    }
}

impl StepExecutor for ClaudeExecutor {
    fn execute(&mut self, request: &StepRequest<'_>) -> vbconvert_core::Result<StepOutcome> {
        let invocation = self.invocation(request);
        let outcome = self
            .runtime
            .block_on(run_step(&invocation))
            .map_err(|e| ConvertError::Executor(e.to_string()))?;
        Ok(StepOutcome {
            exit_code: outcome.exit_code,
            interrupted: outcome.interrupted,
        })
    }
}
