use crate::{Error, Result, ToolCommand};

/// Captured result of a command that ran to completion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,

    /// Captured standard error.
    pub stderr: String,

    /// Captured standard output.
    pub stdout: String,
}

impl CommandOutput {
    /// Output of a command that exited with status 0.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stderr: String::new(),
            stdout: stdout.into(),
        }
    }

    /// Output of a command that exited with `exit_code`.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stderr: stderr.into(),
            stdout: String::new(),
        }
    }

    /// Whether the command exited with status 0.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Converts a non-zero exit into [`Error::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Failed`] if the command did not exit with status 0.
    pub fn into_checked(self, command: &ToolCommand) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Failed {
                command: command.to_string(),
                exit_code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}
