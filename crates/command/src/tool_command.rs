//! Description of a single external tool invocation.

use std::fmt;
use std::time::Duration;

/// Ceiling applied to every tool invocation unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// A program, its arguments and the time it is allowed to run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ToolCommand {
    args: Vec<String>,
    program: String,
    timeout: Duration,
}

impl ToolCommand {
    /// Creates a command for `program` with no arguments and the default timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            args: Vec::new(),
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the ceiling for this command.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments passed to the program.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The ceiling for this command.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The full argument vector, program first.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}
