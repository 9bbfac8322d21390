//! Error types for command execution.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum Error {
    /// The executable could not be located.
    #[error("executable not found: {0}")]
    BinaryNotFound(String),

    /// The command ran and exited with a non-zero status.
    #[error("command \"{command}\" failed with {}: {stderr}", describe_exit(.exit_code))]
    Failed {
        /// The command line that was run.
        command: String,

        /// The exit code, or `None` if the process was killed by a signal.
        exit_code: Option<i32>,

        /// Captured standard error.
        stderr: String,
    },

    /// IO error.
    #[error("io error: {0} - {1}")]
    Io(&'static str, #[source] io::Error),

    /// Failed to spawn the process.
    #[error("failed to spawn \"{0}\": {1}")]
    Spawn(String, #[source] io::Error),

    /// The command did not finish within its ceiling.
    #[error("timeout of {timeout:?} exceeded while running \"{command}\"")]
    TimedOut {
        /// The command line that was run.
        command: String,

        /// The ceiling that was exceeded.
        timeout: Duration,
    },
}

impl Error {
    /// Whether this error is a timeout rather than a failure.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

#[allow(clippy::ref_option)]
fn describe_exit(exit_code: &Option<i32>) -> String {
    exit_code.map_or_else(
        || "termination by signal".to_string(),
        |code| format!("exit code {code}"),
    )
}
