//! Git subprocess execution.
//!
//! Commands are always spawned with an argument vector, never through a
//! shell, so file paths containing shell metacharacters are passed through
//! untouched.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit code reported when a command could not be started at all.
pub const SPAWN_FAILURE_CODE: i32 = 1;

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output for a command that never ran.
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self {
            exit_code: SPAWN_FAILURE_CODE,
            stdout: String::new(),
            stderr: message.into(),
        }
    }

    /// Non-empty NUL-terminated stdout fields, as printed by `git ... -z`.
    ///
    /// Fields are returned verbatim: paths may legitimately contain
    /// whitespace, newlines or non-ASCII bytes.
    pub fn nul_fields(&self) -> impl Iterator<Item = &str> {
        self.stdout.split('\0').filter(|field| !field.is_empty())
    }
}

/// Trait for executing external commands.
///
/// This abstraction allows scripting git output in tests. Implementations
/// must never fail: spawn errors are folded into a [`CommandOutput`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command[0]` with the remaining elements as arguments.
    async fn run(&self, command: &[String]) -> CommandOutput;
}

/// Runner that spawns real processes, optionally inside a fixed directory.
#[derive(Debug, Clone, Default)]
pub struct GitRunner {
    workdir: Option<PathBuf>,
}

impl GitRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command with `dir` as its working directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(dir.into()),
        }
    }
}

#[async_trait]
impl CommandRunner for GitRunner {
    async fn run(&self, command: &[String]) -> CommandOutput {
        let Some((program, args)) = command.split_first() else {
            return CommandOutput::spawn_failure("Empty command");
        };

        debug!("Running {}", command.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        match cmd.output().await {
            Ok(output) => CommandOutput {
                // Killed by a signal: no exit code.
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let message = format!(
                    "{} command not found. Is it installed and in your PATH?",
                    program
                );
                warn!("{}", message);
                CommandOutput::spawn_failure(message)
            }
            Err(e) => {
                let message = format!("Exception running command {}: {}", command.join(" "), e);
                warn!("{}", message);
                CommandOutput::spawn_failure(message)
            }
        }
    }
}

/// Check that the `git` executable is available on PATH.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Build an owned argument vector from string slices.
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
