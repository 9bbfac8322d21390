//! Peer coordination for MicroCloud formation, expansion and shrinkage.
//!
//! Each member evaluates one trigger at a time. An evaluation reads the
//! replicated peer bag, probes the clustering tool, resolves a [`Role`] and
//! then invokes the external tools that role calls for. Nothing but the
//! member's own `clustered` flag and its last-applied configuration survives
//! an evaluation; retries happen only when the surrounding scheduler
//! re-delivers a trigger the [`Outcome`] marked as deferred.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod config;
mod coordinator;
mod error;
mod flag;
mod inventory;
mod leadership;
mod phase;
mod role;
mod status;
mod tools;
mod trigger;

pub use config::{CharmConfig, ConfigDelta, ConfigKey, ConfigSnapshot};
pub use coordinator::{Coordinator, CoordinatorOptions};
pub use error::{Error, RemovalStep, Result};
pub use flag::{CLUSTERED_KEY, ClusteredFlag};
pub use inventory::{LxdInventory, Workload, WorkloadInventory};
pub use leadership::{Leadership, StaticLeadership};
pub use phase::Phase;
pub use role::{ClusterView, Evaluation, Probe, Role, WaitReason, resolve};
pub use status::{MemoryStatusSink, StatusReporter, StatusSink, UnitStatus};
pub use tools::Tools;
pub use trigger::{Outcome, Trigger};
