use std::fmt;
use std::str::FromStr;

use crate::ClaudeAgentError;

/// Permission mode passed as `--permission-mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// Standard: prompts for dangerous operations
    Default,
    /// Auto-accept file edit operations
    #[default]
    AcceptEdits,
    /// Bypass all permission checks
    BypassPermissions,
    /// Planning mode, no actual tool execution
    Plan,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionMode {
    type Err = ClaudeAgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(PermissionMode::Default),
            "acceptEdits" => Ok(PermissionMode::AcceptEdits),
            "bypassPermissions" => Ok(PermissionMode::BypassPermissions),
            "plan" => Ok(PermissionMode::Plan),
            other => Err(ClaudeAgentError::InvalidValue {
                kind: "permission mode",
                value: other.to_string(),
            }),
        }
    }
}

/// `--output-format` / `--input-format` values accepted by the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamFormat {
    #[default]
    Text,
    Json,
    StreamJson,
}

impl StreamFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamFormat::Text => "text",
            StreamFormat::Json => "json",
            StreamFormat::StreamJson => "stream-json",
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamFormat {
    type Err = ClaudeAgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(StreamFormat::Text),
            "json" => Ok(StreamFormat::Json),
            "stream-json" => Ok(StreamFormat::StreamJson),
            other => Err(ClaudeAgentError::InvalidValue {
                kind: "stream format",
                value: other.to_string(),
            }),
        }
    }
}
