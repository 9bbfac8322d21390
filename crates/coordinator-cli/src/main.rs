//! Evaluates one lifecycle trigger for this MicroCloud member and exits.
//!
//! Exits with 75 (`EX_TEMPFAIL`) when the trigger should be delivered again later.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod state;
mod status_file;

use error::Result;
use state::{LocalState, load_config};
use status_file::FileStatusSink;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use microcloud_command::ProcessRunner;
use microcloud_coordinator::{
    CharmConfig, Coordinator, CoordinatorOptions, LxdInventory, StaticLeadership, Tools, Trigger,
};
use microcloud_peer_store::{MemberId, PeerBag};
use microcloud_peer_store_fs::FsPeerStore;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

const EX_TEMPFAIL: u8 = 75;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Operator configuration file (JSON, kebab-case keys)
    #[arg(long, env = "MICROCLOUD_CONFIG")]
    config: Option<PathBuf>,

    /// Whether this member is the elected leader
    #[arg(long, env = "MICROCLOUD_LEADER")]
    leader: bool,

    /// Log level
    #[arg(long, default_value_t = Level::INFO, env = "MICROCLOUD_LOG_LEVEL")]
    log_level: Level,

    /// Identity of this member, the hostname by default
    #[arg(long, env = "MICROCLOUD_MEMBER_ID")]
    member_id: Option<String>,

    /// Directory shared by all members holding the peer bag
    #[arg(
        long,
        default_value = "/var/lib/microcloud-coordinator/peers",
        env = "MICROCLOUD_PEER_DIR"
    )]
    peer_dir: PathBuf,

    /// Intended number of members
    #[arg(long, env = "MICROCLOUD_PLANNED_UNITS")]
    planned_units: usize,

    /// Directory for this member's own state
    #[arg(
        long,
        default_value = "/var/lib/microcloud-coordinator",
        env = "MICROCLOUD_STATE_DIR"
    )]
    state_dir: PathBuf,

    /// Ceiling for every tool invocation, in seconds
    #[arg(long, default_value_t = 600, env = "MICROCLOUD_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// Search path for the clustering tools, `PATH` by default
    #[arg(long, env = "MICROCLOUD_TOOL_PATH")]
    tool_path: Option<OsString>,

    #[command(subcommand)]
    trigger: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// This member joined the peer group
    RelationCreated,

    /// The operator configuration changed
    ConfigChanged,

    /// This member started
    Start,

    /// Another unit joined the peer group
    RelationJoined {
        /// The unit that joined
        unit: String,
    },

    /// Periodic health check
    UpdateStatus,

    /// This member is shutting down
    Stop,
}

impl From<Command> for Trigger {
    fn from(command: Command) -> Self {
        match command {
            Command::RelationCreated => Self::RelationCreated,
            Command::ConfigChanged => Self::ConfigChanged,
            Command::Start => Self::Start,
            Command::RelationJoined { unit } => Self::RelationJoined {
                unit: MemberId::new(unit),
            },
            Command::UpdateStatus => Self::UpdateStatus,
            Command::Stop => Self::Stop,
        }
    }
}

fn process_runner(tool_path: Option<OsString>) -> ProcessRunner {
    tool_path.map_or_else(ProcessRunner::new, ProcessRunner::with_search_path)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(args.log_level)
            .finish(),
    )?;

    let member = match args.member_id {
        Some(member_id) => MemberId::new(member_id),
        None => MemberId::new(nix::unistd::gethostname()?.to_string_lossy()),
    };

    let config = match &args.config {
        Some(path) => load_config(path).await?,
        None => CharmConfig::default(),
    };

    let state = LocalState::new(&args.state_dir);
    let snapshot = state.load_snapshot().await?;

    let tools = Tools::new(Duration::from_secs(args.timeout_secs));
    let runner = process_runner(args.tool_path);

    let mut coordinator = Coordinator::new(CoordinatorOptions {
        bag: PeerBag::new(FsPeerStore::new(&args.peer_dir), member.clone()),
        config,
        inventory: LxdInventory::new(runner.clone(), tools),
        leadership: StaticLeadership {
            is_leader: args.leader,
            planned_units: args.planned_units,
        },
        runner,
        snapshot,
        status: FileStatusSink::new(state.status_path()),
        tools,
    });

    let trigger = Trigger::from(args.trigger);
    let outcome = coordinator.handle(&trigger).await?;

    if let Some(snapshot) = coordinator.snapshot() {
        state.save_snapshot(snapshot).await?;
    }

    if let Some(condition) = &outcome.condition {
        warn!("{} ended with: {}", trigger, condition);
    }

    info!(
        %member,
        phase = %outcome.phase,
        deferred = outcome.deferred,
        "{} evaluated",
        trigger
    );

    Ok(if outcome.deferred {
        ExitCode::from(EX_TEMPFAIL)
    } else {
        ExitCode::SUCCESS
    })
}
