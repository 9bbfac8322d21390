//! Process-backed command runner.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, warn};

use crate::{CommandOutput, CommandRunner, Error, Result, ToolCommand};

/// Runs commands as child processes of the current process.
///
/// The child is killed if it outlives the command's timeout.
#[derive(Clone, Debug, Default)]
pub struct ProcessRunner {
    /// Overrides `PATH` when resolving executables.
    search_path: Option<OsString>,
}

impl ProcessRunner {
    /// Creates a runner that resolves executables from `PATH`.
    #[must_use]
    pub const fn new() -> Self {
        Self { search_path: None }
    }

    /// Creates a runner that resolves executables from `search_path` only.
    #[must_use]
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    fn resolve(&self, program: &str) -> Result<PathBuf> {
        let resolved = match &self.search_path {
            Some(search_path) => {
                let cwd = std::env::current_dir()
                    .map_err(|e| Error::Io("failed to read current directory", e))?;
                which::which_in(program, Some(search_path), cwd)
            }
            None => which::which(program),
        };

        resolved.map_err(|_| Error::BinaryNotFound(program.to_string()))
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        let executable = self.resolve(command.program())?;

        let mut cmd = Command::new(executable);
        cmd.args(command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running \"{}\" (timeout {:?})", command, command.timeout());

        let child = cmd
            .spawn()
            .map_err(|e| Error::Spawn(command.to_string(), e))?;

        // Dropping the pending future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(command.timeout(), child.wait_with_output()).await
        {
            Ok(result) => result.map_err(|e| Error::Io("failed to wait for command", e))?,
            Err(_) => {
                warn!(
                    "\"{}\" did not finish within {:?}, killing it",
                    command,
                    command.timeout()
                );
                return Err(Error::TimedOut {
                    command: command.to_string(),
                    timeout: command.timeout(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        for line in stdout.lines() {
            debug!(target: "microcloud-command", "[{}] {}", command.program(), line);
        }

        let exit_code = output.status.code();
        if output.status.success() {
            debug!("\"{}\" exited successfully", command);
        } else {
            for line in stderr.lines() {
                error!(target: "microcloud-command", "[{}] {}", command.program(), line);
            }
            warn!("\"{}\" exited with status: {}", command, output.status);
        }

        Ok(CommandOutput {
            exit_code,
            stderr,
            stdout,
        })
    }
}
