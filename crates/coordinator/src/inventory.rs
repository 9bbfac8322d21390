//! Workloads hosted by the cluster, consulted before a member leaves.

use async_trait::async_trait;
use microcloud_command::CommandRunner;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, Tools};

/// An instance running somewhere in the cluster.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Workload {
    /// Instance name.
    pub name: String,

    /// Member hosting the instance.
    #[serde(default)]
    pub location: String,

    /// Reported state, e.g. `Running` or `Stopped`.
    #[serde(default)]
    pub status: String,
}

/// Source of the workloads currently placed on cluster members.
#[async_trait]
pub trait WorkloadInventory
where
    Self: Send + Sync + 'static,
{
    /// Lists every workload known to the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be obtained or parsed.
    async fn list_active_workloads(&self) -> Result<Vec<Workload>>;
}

/// Inventory backed by `lxc list`.
///
/// Every listed instance counts, stopped ones included, since their local
/// storage lives on the member.
#[derive(Clone, Debug)]
pub struct LxdInventory<R> {
    runner: R,
    tools: Tools,
}

impl<R> LxdInventory<R>
where
    R: CommandRunner,
{
    /// Creates an inventory running `lxc` through `runner`.
    pub const fn new(runner: R, tools: Tools) -> Self {
        Self { runner, tools }
    }
}

#[async_trait]
impl<R> WorkloadInventory for LxdInventory<R>
where
    R: CommandRunner,
{
    async fn list_active_workloads(&self) -> Result<Vec<Workload>> {
        let output = self.runner.run_checked(&self.tools.list_instances()).await?;

        let workloads: Vec<Workload> = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::WorkloadInventory(format!("invalid instance listing: {e}")))?;

        debug!("inventory lists {} instance(s)", workloads.len());

        Ok(workloads)
    }
}
