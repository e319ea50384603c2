//! External tool invocation.
//!
//! Every collaborator (gource, ffmpeg, git, the avatar script) is run through
//! [`ToolCommand`], which keeps the program and its arguments as a typed list.
//! Nothing goes through a shell, so repository names, log names and hide
//! items are never re-tokenized or quoted.
//!
//! Runs are bounded by [`RunLimits`]:
//! - a timeout, after which the child is killed
//! - a `CancellationToken` (server shutdown)
//! - dropping the future (client disconnect), since children are spawned
//!   with `kill_on_drop`

use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default bound on a single tool run (5 minutes).
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started (missing binary, permissions).
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("{command} exited with {status}\nstderr: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The program ran past its time budget and was killed.
    #[error("{command} timed out after {}s", timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    /// The run was cancelled and the child was killed.
    #[error("{command} cancelled")]
    Cancelled { command: String },

    /// IO error while waiting on the child or its pipes.
    #[error("IO error running {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    /// The tool's diagnostic text, if it produced any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ToolError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::TimedOut { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled { .. })
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Time and cancellation bounds for tool runs.
#[derive(Debug, Clone)]
pub struct RunLimits {
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for RunLimits {
    fn default() -> Self {
        RunLimits {
            timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            cancel: CancellationToken::new(),
        }
    }
}

impl RunLimits {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        RunLimits { timeout, cancel }
    }

    /// Drives `fut` to completion unless the timeout or cancellation fires
    /// first. Dropping `fut` kills any `kill_on_drop` child it owns.
    pub async fn enforce<F, T>(&self, command: &str, fut: F) -> Result<T, ToolError>
    where
        F: Future<Output = io::Result<T>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                warn!(command = %command, "Tool run cancelled");
                Err(ToolError::Cancelled { command: command.to_string() })
            }
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => Err(ToolError::Io { command: command.to_string(), source }),
                Err(_) => {
                    warn!(command = %command, timeout_secs = self.timeout.as_secs(), "Tool run timed out");
                    Err(ToolError::TimedOut { command: command.to_string(), timeout: self.timeout })
                }
            },
        }
    }
}

/// A program invocation with a typed argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ToolCommand {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
        }
    }

    /// Appends one argument. Never split on whitespace.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Human-readable rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }

    /// Builds the tokio command: stdin closed, stdout/stderr piped, killed
    /// on drop. Callers may override stdio before spawning.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Spawns the command and waits for it within `limits`.
    ///
    /// A non-zero exit becomes [`ToolError::Failed`] carrying stderr.
    pub async fn run(&self, limits: &RunLimits) -> Result<ToolOutput, ToolError> {
        let command = self.display();
        debug!(command = %command, cwd = ?self.current_dir, "Running tool");

        let child = self
            .to_command()
            .spawn()
            .map_err(|source| ToolError::Spawn {
                command: command.clone(),
                source,
            })?;

        let output = limits.enforce(&command, child.wait_with_output()).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        check_status(&command, output.status, &stderr)?;
        Ok(ToolOutput { stdout, stderr })
    }
}

/// Maps a non-success exit status to [`ToolError::Failed`].
pub fn check_status(command: &str, status: ExitStatus, stderr: &str) -> Result<(), ToolError> {
    if status.success() {
        return Ok(());
    }
    Err(ToolError::Failed {
        command: command.to_string(),
        status: status.to_string(),
        stderr: stderr.trim_end().to_string(),
    })
}
