pub mod audit;
pub mod convert;
pub mod forms;
pub mod paths;
pub mod spec;
pub mod status;
pub mod step;

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use vbconvert_core::config::Config;

/// `--entity` is optional in clap so that a missing value reports the same
/// short error and exit code 1 for every command.
pub fn require_entity(entity: Option<&str>) -> anyhow::Result<&str> {
    match entity {
        Some(e) if !e.trim().is_empty() => Ok(e),
        _ => bail!("--entity is required"),
    }
}

/// `--output` when given, otherwise the config's outputDir.
pub fn output_root(config: &Config, output: Option<&Path>) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output_root())
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| format!("failed to load config {}", path.display()))
}
