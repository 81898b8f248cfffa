//! `claude-agent`: drives the `claude` CLI as a subprocess for one pipeline
//! step at a time.
//!
//! ```text
//! FlagSet (base) ─┐
//!                 ├─ merge ─▶ argv ─▶ AgentProcess ─▶ StepOutcome
//! FlagSet (user) ─┘                  (signal forwarding, stdout capture)
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use claude_agent::{run_step, StepInvocation};
//!
//! let outcome = run_step(&invocation).await?;
//! if !outcome.success() {
//!     std::process::exit(outcome.exit_code);
//! }
//! ```

pub mod error;
pub mod flags;
pub mod process;
pub mod runner;
pub mod types;

pub use error::ClaudeAgentError;
pub use flags::{FlagSet, FlagValue, INTERNAL_KEYS};
pub use process::{AgentProcess, OutputMode, ProcessExit};
pub use runner::{run_step, StepInvocation, StepOutcome};
pub use types::{PermissionMode, StreamFormat};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClaudeAgentError>;
