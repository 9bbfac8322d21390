//! Bounded execution of external clustering tools.
//!
//! Every tool invocation goes through a [`CommandRunner`], which reports the
//! captured output and exit code of a finished command, and reports a command
//! that outlives its ceiling as [`Error::TimedOut`] rather than as a failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use microcloud_command::{CommandRunner, ProcessRunner, Result, ToolCommand};
//!
//! async fn run() -> Result<()> {
//!     let runner = ProcessRunner::new();
//!     let output = runner
//!         .run_checked(&ToolCommand::new("lxc").args(["cluster", "list"]))
//!         .await?;
//!
//!     println!("{}", output.stdout);
//!
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod output;
mod runner;
mod tool_command;

pub use error::{Error, Result};
pub use output::CommandOutput;
pub use runner::ProcessRunner;
pub use tool_command::{DEFAULT_TIMEOUT, ToolCommand};

use async_trait::async_trait;

/// Runs external commands with a bounded timeout.
#[async_trait]
pub trait CommandRunner
where
    Self: Send + Sync + 'static,
{
    /// Runs `command` to completion or until its timeout elapses.
    ///
    /// A command that exits with a non-zero status is still `Ok`; use
    /// [`CommandRunner::run_checked`] to treat that as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimedOut`] when the ceiling is exceeded, or an error if
    /// the executable cannot be found or spawned.
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput>;

    /// Runs `command` and converts a non-zero exit into [`Error::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Failed`] on non-zero exit, plus any error of [`CommandRunner::run`].
    async fn run_checked(&self, command: &ToolCommand) -> Result<CommandOutput> {
        self.run(command).await?.into_checked(command)
    }
}
