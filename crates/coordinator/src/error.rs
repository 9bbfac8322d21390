//! Error types for the coordinator.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One step of the fixed member removal sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RemovalStep {
    /// Remove from the LXD cluster.
    Lxd,

    /// Remove from the MicroCeph cluster.
    MicroCeph,

    /// Remove from the MicroOVN cluster.
    MicroOvn,

    /// Remove from MicroCloud itself.
    MicroCloud,
}

impl fmt::Display for RemovalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lxd => "LXD",
            Self::MicroCeph => "MicroCeph",
            Self::MicroOvn => "MicroOVN",
            Self::MicroCloud => "MicroCloud",
        })
    }
}

/// Conditions an evaluation can end in.
///
/// Most of these are converted into a unit status rather than propagated.
#[derive(Debug, Error)]
pub enum Error {
    /// A clustering tool is not installed.
    #[error("Executable not found: {0}")]
    BinaryNotFound(String),

    /// The operator configuration is logically invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The removal sequence stopped part-way.
    #[error(
        "Removal of {member} stopped after [{}]: {source}",
        join_steps(.completed)
    )]
    PartialRemoval {
        /// The member being removed.
        member: String,

        /// Steps that succeeded before the failure.
        completed: Vec<RemovalStep>,

        /// The failure that stopped the sequence.
        #[source]
        source: Box<Self>,
    },

    /// Writing to the peer bag failed.
    #[error("Peer store error: {0}")]
    PeerStore(String),

    /// Not every intended member is present yet.
    #[error("{present} of {planned} units are present")]
    QuorumNotReady {
        /// Members present.
        present: usize,

        /// Intended group size.
        planned: usize,
    },

    /// The member still hosts workloads.
    #[error("This MicroCloud unit contains instances. You can't remove it.")]
    RemovalRefusedWorkloadsPresent {
        /// The member that was to be removed.
        member: String,

        /// Names of the workloads located on it.
        workloads: Vec<String>,
    },

    /// A tool exited with a non-zero status.
    #[error("Failed to run \"{command}\": {stderr} ({})", describe_code(.exit_code))]
    ToolExecutionFailed {
        /// The command line that was run.
        command: String,

        /// Exit code, or `None` if the tool was killed by a signal.
        exit_code: Option<i32>,

        /// Captured standard error.
        stderr: String,
    },

    /// A tool could not be started.
    #[error("Failed to launch tool: {0}")]
    ToolLaunch(String),

    /// A tool outlived its ceiling.
    #[error("Timeout exceeded while running \"{command}\"")]
    ToolTimedOut {
        /// The command line that was run.
        command: String,

        /// The ceiling that was exceeded.
        timeout: Duration,
    },

    /// The workload inventory could not be read.
    #[error("Failed to list workloads: {0}")]
    WorkloadInventory(String),
}

impl Error {
    /// Whether this is a tool timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ToolTimedOut { .. })
    }
}

impl From<microcloud_command::Error> for Error {
    fn from(error: microcloud_command::Error) -> Self {
        match error {
            microcloud_command::Error::BinaryNotFound(program) => Self::BinaryNotFound(program),
            microcloud_command::Error::Failed {
                command,
                exit_code,
                stderr,
            } => Self::ToolExecutionFailed {
                command,
                exit_code,
                stderr,
            },
            microcloud_command::Error::TimedOut { command, timeout } => {
                Self::ToolTimedOut { command, timeout }
            }
            other @ (microcloud_command::Error::Io(..) | microcloud_command::Error::Spawn(..)) => {
                Self::ToolLaunch(other.to_string())
            }
        }
    }
}

#[allow(clippy::ref_option)]
fn describe_code(exit_code: &Option<i32>) -> String {
    exit_code.map_or_else(|| "signal".to_string(), |code| code.to_string())
}

fn join_steps(steps: &[RemovalStep]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
