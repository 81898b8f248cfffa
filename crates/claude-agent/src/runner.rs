use std::path::PathBuf;

use tokio::process::Command;
use tracing::info;

use crate::flags::FlagSet;
use crate::process::{AgentProcess, OutputMode};
use crate::types::{PermissionMode, StreamFormat};
use crate::Result;

// ─── StepInvocation ───────────────────────────────────────────────────────

/// Everything needed to run one pipeline step through `claude`.
#[derive(Debug, Clone)]
pub struct StepInvocation {
    /// Used for logging only.
    pub step_name: String,
    /// Positional prompt argument.
    pub prompt: String,
    pub system_prompt: String,
    /// Serialized into `--settings`.
    pub settings: serde_json::Value,
    pub mcp_config: Option<String>,
    pub permission_mode: Option<PermissionMode>,
    pub model: Option<String>,
    /// Passed as `--add-dir`.
    pub add_dirs: Vec<PathBuf>,
    pub interactive: bool,
    /// Overrides the base flags key by key.
    pub user_flags: FlagSet,
    pub executable: PathBuf,
    pub project_root: PathBuf,
    /// Environment variable that carries `project_root`.
    pub project_root_env: String,
    /// Captured stdout in non-interactive mode.
    pub log_file: Option<PathBuf>,
}

/// Result of one step. `exit_code` 0 means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub exit_code: i32,
    pub interrupted: bool,
}

impl StepOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.interrupted
    }
}

impl StepInvocation {
    /// Flags every step gets before user overrides.
    pub fn base_flags(&self) -> Result<FlagSet> {
        let mut flags = FlagSet::new();
        flags.set("system-prompt", self.system_prompt.as_str());
        flags.set("settings", serde_json::to_string(&self.settings)?);
        if let Some(mcp) = &self.mcp_config {
            flags.set("mcp-config", mcp.as_str());
        }
        if !self.interactive {
            flags.set("print", true);
            flags.set("output-format", StreamFormat::Text.as_str());
        }
        if let Some(mode) = self.permission_mode {
            flags.set("permission-mode", mode.as_str());
        }
        if let Some(model) = &self.model {
            flags.set("model", model.as_str());
        }
        if !self.add_dirs.is_empty() {
            flags.set(
                "add-dir",
                self.add_dirs
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>(),
            );
        }
        Ok(flags)
    }

    /// Full argv after the executable: prompt first, then merged flags.
    pub fn args(&self) -> Result<Vec<String>> {
        let mut args = vec![self.prompt.clone()];
        args.extend(self.base_flags()?.merge(&self.user_flags).to_args());
        Ok(args)
    }

    pub fn command(&self) -> Result<Command> {
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.args()?)
            .current_dir(&self.project_root)
            .env(&self.project_root_env, &self.project_root)
            // Allow running from inside a Claude session.
            .env_remove("CLAUDECODE");
        Ok(cmd)
    }
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run one step to completion. No retries; a non-zero exit is reported in
/// the outcome, not as an error.
pub async fn run_step(inv: &StepInvocation) -> Result<StepOutcome> {
    let output = if inv.interactive {
        OutputMode::Inherit
    } else {
        OutputMode::Capture {
            log_file: inv.log_file.clone(),
        }
    };

    info!(step = %inv.step_name, interactive = inv.interactive, "starting claude");
    let process = AgentProcess::spawn(inv.command()?, output)?;
    let exit = process.wait().await?;
    info!(
        step = %inv.step_name,
        exit_code = exit.code,
        interrupted = exit.interrupted,
        "claude finished"
    );

    Ok(StepOutcome {
        exit_code: exit.code,
        interrupted: exit.interrupted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagValue;
    use tempfile::TempDir;

    fn invocation(dir: &std::path::Path, executable: &str) -> StepInvocation {
        StepInvocation {
            step_name: "extract-search-form".into(),
            prompt: "Analyze frmFacilitySearch".into(),
            system_prompt: "You convert forms.".into(),
            settings: serde_json::json!({}),
            mcp_config: None,
            permission_mode: Some(PermissionMode::AcceptEdits),
            model: None,
            add_dirs: vec![PathBuf::from("/legacy"), PathBuf::from("/out")],
            interactive: false,
            user_flags: FlagSet::new(),
            executable: PathBuf::from(executable),
            project_root: dir.to_path_buf(),
            project_root_env: "CLAUDE_PROJECT_DIR".into(),
            log_file: Some(dir.join("logs/01.log")),
        }
    }

    #[test]
    fn args_put_prompt_first_then_base_flags() {
        let dir = TempDir::new().unwrap();
        let inv = invocation(dir.path(), "claude");
        assert_eq!(
            inv.args().unwrap(),
            vec![
                "Analyze frmFacilitySearch",
                "--system-prompt",
                "You convert forms.",
                "--settings",
                "{}",
                "--print",
                "--output-format",
                "text",
                "--permission-mode",
                "acceptEdits",
                "--add-dir",
                "/legacy",
                "/out",
            ]
        );
    }

    #[test]
    fn user_flags_override_and_interactive_drops_print() {
        let dir = TempDir::new().unwrap();
        let mut inv = invocation(dir.path(), "claude");
        inv.interactive = true;
        inv.mcp_config = Some(".mcp.json".into());
        inv.user_flags = FlagSet::new()
            .with("permission-mode", "plan")
            .with("model", "opus")
            .with("skip-steps", "1,2");
        let args = inv.args().unwrap();
        assert!(!args.contains(&"--print".to_string()));
        assert!(args.windows(2).any(|w| w == ["--permission-mode", "plan"]));
        assert!(args.windows(2).any(|w| w == ["--mcp-config", ".mcp.json"]));
        assert!(args.ends_with(&["--model".to_string(), "opus".to_string()]));
        assert!(!args.iter().any(|a| a == "--skip-steps"));
        assert_eq!(
            inv.base_flags().unwrap().get("settings"),
            Some(&FlagValue::Str("{}".into()))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_step_reports_exit_codes() {
        let dir = TempDir::new().unwrap();
        let ok = run_step(&invocation(dir.path(), "true")).await.unwrap();
        assert!(ok.success());

        let failed = run_step(&invocation(dir.path(), "false")).await.unwrap();
        assert_eq!(failed.exit_code, 1);
        assert!(!failed.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_step_sets_project_env_and_logs_stdout() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake-claude.sh");
        std::fs::write(
            &script,
            "echo \"root=$CLAUDE_PROJECT_DIR\"\necho \"nested=${CLAUDECODE:-unset}\"\n",
        )
        .unwrap();

        // `sh <script> …`: the prompt slot carries the script path.
        let mut inv = invocation(dir.path(), "sh");
        inv.prompt = script.display().to_string();
        let outcome = run_step(&inv).await.unwrap();
        assert!(outcome.success());

        let log = std::fs::read_to_string(dir.path().join("logs/01.log")).unwrap();
        assert!(log.contains(&format!("root={}", dir.path().display())));
        assert!(log.contains("nested=unset"));
    }
}
