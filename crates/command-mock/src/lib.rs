//! Mock implementation of the command runner for testing purposes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use microcloud_command::{CommandOutput, CommandRunner, Error, Result, ToolCommand};
use parking_lot::Mutex;
use tracing::debug;

/// Scripted reply for a command line.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// The executable is missing.
    BinaryNotFound,

    /// The command ran to completion with this output.
    Output(CommandOutput),

    /// The command exceeded its ceiling.
    TimedOut,
}

impl MockReply {
    /// A zero exit with `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::Output(CommandOutput::success(stdout))
    }

    /// A non-zero exit with `stderr`.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::Output(CommandOutput::failure(exit_code, stderr))
    }
}

#[derive(Debug, Default)]
struct State {
    invocations: Vec<ToolCommand>,
    replies: HashMap<String, MockReply>,
}

/// Command runner that replays scripted replies and records every invocation.
///
/// Replies are matched on the full command line (`program arg1 arg2`).
/// Unscripted commands succeed with empty output.
#[derive(Clone, Debug, Default)]
pub struct MockCommandRunner {
    state: Arc<Mutex<State>>,
}

impl MockCommandRunner {
    /// Creates a runner where every command succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `reply` for `command_line`, replacing any earlier script.
    pub fn on(&self, command_line: impl Into<String>, reply: MockReply) -> &Self {
        self.state.lock().replies.insert(command_line.into(), reply);
        self
    }

    /// Every command run so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<String> {
        self.state
            .lock()
            .invocations
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// How many times `command_line` has been run.
    #[must_use]
    pub fn count(&self, command_line: &str) -> usize {
        self.state
            .lock()
            .invocations
            .iter()
            .filter(|command| command.to_string() == command_line)
            .count()
    }

    /// Forgets recorded invocations, keeping the scripted replies.
    pub fn clear_invocations(&self) {
        self.state.lock().invocations.clear();
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        let command_line = command.to_string();
        let reply = {
            let mut state = self.state.lock();
            state.invocations.push(command.clone());
            state.replies.get(&command_line).cloned()
        };

        debug!("mock run: {}", command_line);

        match reply {
            None => Ok(CommandOutput::success("")),
            Some(MockReply::Output(output)) => Ok(output),
            Some(MockReply::TimedOut) => Err(Error::TimedOut {
                command: command_line,
                timeout: command.timeout(),
            }),
            Some(MockReply::BinaryNotFound) => {
                Err(Error::BinaryNotFound(command.program().to_string()))
            }
        }
    }
}
