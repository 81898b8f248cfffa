use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "vbconvert.json";

// ---------------------------------------------------------------------------
// ProjectLayout
// ---------------------------------------------------------------------------

/// Folder layout of an ASP.NET Core MVC project (reference or target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLayout {
    pub root: PathBuf,
    #[serde(default = "default_controllers")]
    pub controllers: String,
    #[serde(default = "default_dtos")]
    pub dtos: String,
    #[serde(default = "default_repositories")]
    pub repositories: String,
    #[serde(default = "default_services")]
    pub services: String,
    #[serde(default = "default_views")]
    pub views: String,
    #[serde(default = "default_javascript")]
    pub javascript: String,
}

fn default_controllers() -> String {
    "Controllers".to_string()
}

fn default_dtos() -> String {
    "Models/DTOs".to_string()
}

fn default_repositories() -> String {
    "Repositories".to_string()
}

fn default_services() -> String {
    "Services".to_string()
}

fn default_views() -> String {
    "Views".to_string()
}

fn default_javascript() -> String {
    "wwwroot/js".to_string()
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            controllers: default_controllers(),
            dtos: default_dtos(),
            repositories: default_repositories(),
            services: default_services(),
            views: default_views(),
            javascript: default_javascript(),
        }
    }
}

// ---------------------------------------------------------------------------
// ClaudeConfig
// ---------------------------------------------------------------------------

/// How the coding-assistant CLI is invoked for every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaudeConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Passed verbatim as `--settings <json>`.
    #[serde(default = "default_settings")]
    pub settings: serde_json::Value,
    /// Path to an MCP config file, or inline JSON.
    #[serde(default)]
    pub mcp_config: Option<String>,
    #[serde(default = "default_permission_mode")]
    pub permission_mode: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable carrying the project root to the child process.
    #[serde(default = "default_project_root_env")]
    pub project_root_env: String,
}

fn default_binary() -> String {
    "claude".to_string()
}

fn default_settings() -> serde_json::Value {
    serde_json::json!({})
}

fn default_permission_mode() -> Option<String> {
    Some("acceptEdits".to_string())
}

fn default_project_root_env() -> String {
    "CLAUDE_PROJECT_DIR".to_string()
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            settings: default_settings(),
            mcp_config: None,
            permission_mode: default_permission_mode(),
            model: None,
            project_root_env: default_project_root_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root of the legacy VB.NET source tree.
    pub input_dir: PathBuf,
    #[serde(default = "default_forms_path")]
    pub forms_path: String,
    #[serde(default = "default_business_objects_path")]
    pub business_objects_path: String,
    #[serde(default = "default_lists_path")]
    pub lists_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,
    #[serde(default)]
    pub master_plan_dir: Option<PathBuf>,
    pub reference_project: ProjectLayout,
    pub target_project: ProjectLayout,
    #[serde(default)]
    pub claude: ClaudeConfig,
    /// Directory the config was loaded from; relative paths resolve against it.
    #[serde(skip)]
    pub root: PathBuf,
}

fn default_forms_path() -> String {
    "Forms".to_string()
}

fn default_business_objects_path() -> String {
    "BusinessObjects".to_string()
}

fn default_lists_path() -> String {
    "Lists".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConvertError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&data)?;
        config.root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig("inputDir is empty".into()));
        }
        for (name, value) in [
            ("formsPath", &self.forms_path),
            ("businessObjectsPath", &self.business_objects_path),
            ("listsPath", &self.lists_path),
        ] {
            if value.trim().is_empty() {
                return Err(ConvertError::InvalidConfig(format!("{name} is empty")));
            }
        }
        if self.claude.binary.trim().is_empty() {
            return Err(ConvertError::InvalidConfig("claude.binary is empty".into()));
        }
        Ok(())
    }

    /// Resolve `p` against the config directory unless it is already absolute.
    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    pub fn input_root(&self) -> PathBuf {
        self.resolve(&self.input_dir)
    }

    pub fn output_root(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn prompts_root(&self) -> PathBuf {
        self.resolve(&self.prompts_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
