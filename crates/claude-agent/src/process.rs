use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{ClaudeAgentError, Result};

/// How the child's stdio is wired.
#[derive(Debug, Clone)]
pub enum OutputMode {
    /// Share the terminal; used for interactive sessions.
    Inherit,
    /// stdin closed, stdout captured line by line (optionally into a log
    /// file), stderr still on the terminal.
    Capture { log_file: Option<PathBuf> },
}

/// How a child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: i32,
    /// A SIGINT/SIGTERM reached this process while the child ran.
    pub interrupted: bool,
}

// ─── AgentProcess ─────────────────────────────────────────────────────────

/// A running `claude` child. While [`AgentProcess::wait`] is pending,
/// SIGINT/SIGTERM delivered to this process are forwarded as a kill.
pub struct AgentProcess {
    child: Child,
    pump: Option<JoinHandle<()>>,
}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    Signalled,
}

impl AgentProcess {
    pub fn spawn(mut cmd: Command, output: OutputMode) -> Result<Self> {
        let program = cmd.as_std().get_program().to_string_lossy().into_owned();
        match &output {
            OutputMode::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            OutputMode::Capture { .. } => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit());
            }
        }
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|source| ClaudeAgentError::Spawn { program, source })?;

        let pump = match output {
            OutputMode::Inherit => None,
            OutputMode::Capture { log_file } => {
                let stdout = child
                    .stdout
                    .take()
                    .ok_or_else(|| ClaudeAgentError::Process("stdout not captured".into()))?;
                Some(tokio::spawn(pump_stdout(stdout, log_file)))
            }
        };

        Ok(Self { child, pump })
    }

    /// Wait for exit, forwarding an interrupt to the child as a kill.
    pub async fn wait(mut self) -> Result<ProcessExit> {
        let waited = {
            let wait = self.child.wait();
            tokio::select! {
                status = wait => Waited::Exited(status),
                _ = shutdown_signal() => Waited::Signalled,
            }
        };

        let (status, interrupted) = match waited {
            Waited::Exited(status) => (status?, false),
            Waited::Signalled => {
                warn!("interrupt received, stopping claude");
                if let Err(e) = self.child.start_kill() {
                    // Already exited between the signal and the kill.
                    debug!(error = %e, "kill after interrupt failed");
                }
                (self.child.wait().await?, true)
            }
        };

        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                warn!(error = %e, "stdout capture task failed");
            }
        }

        Ok(ProcessExit {
            code: exit_code(&status),
            interrupted,
        })
    }
}

/// The child's exit code; `128 + signal` when it was killed on unix, `1`
/// when no code is available otherwise.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    1
}

async fn pump_stdout(stdout: tokio::process::ChildStdout, log_file: Option<PathBuf>) {
    let mut log = match &log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    warn!(path = %parent.display(), error = %e, "cannot create log dir");
                }
            }
            match tokio::fs::File::create(path).await {
                Ok(f) => Some(f),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot open step log");
                    None
                }
            }
        }
        None => None,
    };

    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(target: "claude", "{line}");
                if let Some(f) = log.as_mut() {
                    let write = async {
                        f.write_all(line.as_bytes()).await?;
                        f.write_all(b"\n").await
                    };
                    if let Err(e) = write.await {
                        warn!(error = %e, "step log write failed, continuing without it");
                        log = None;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "reading claude stdout failed");
                break;
            }
        }
    }
    if let Some(mut f) = log {
        let _ = f.flush().await;
    }
}

/// Resolves on the first SIGINT or SIGTERM (Ctrl-C elsewhere). If the
/// handlers cannot be installed this never resolves.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut int, mut term) = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(i), Ok(t)) => (i, t),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "cannot install signal handlers");
                return std::future::pending().await;
            }
        };
        tokio::select! {
            _ = int.recv() => {},
            _ = term.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
