use std::time::Duration;

use microcloud_command::{DEFAULT_TIMEOUT, ToolCommand};
use microcloud_peer_store::MemberId;

use crate::RemovalStep;

/// Builds the command lines of the clustering tools.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tools {
    timeout: Duration,
}

impl Default for Tools {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Tools {
    /// Creates a builder whose commands use `timeout` as their ceiling.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(&self, program: &str) -> ToolCommand {
        ToolCommand::new(program).with_timeout(self.timeout)
    }

    /// Health probe of this member.
    #[must_use]
    pub fn cluster_list(&self) -> ToolCommand {
        self.command("lxc").args(["cluster", "list"])
    }

    /// Machine readable cluster membership listing.
    #[must_use]
    pub fn cluster_members(&self) -> ToolCommand {
        self.command("lxc")
            .args(["cluster", "list", "--format", "csv"])
    }

    /// Forms the cluster from every reachable member.
    #[must_use]
    pub fn init(&self) -> ToolCommand {
        self.command("microcloud").args(["init", "--auto"])
    }

    /// Enables the object gateway on the storage subsystem.
    #[must_use]
    pub fn enable_rgw(&self) -> ToolCommand {
        self.command("microceph").args(["enable", "rgw"])
    }

    /// Adds every reachable new member to the cluster.
    #[must_use]
    pub fn add(&self) -> ToolCommand {
        self.command("microcloud").args(["add", "--auto"])
    }

    /// Lists instances of every project.
    #[must_use]
    pub fn list_instances(&self) -> ToolCommand {
        self.command("lxc")
            .args(["list", "--all-projects", "--format=json"])
    }

    /// Removes `member` from the subsystem of `step`.
    #[must_use]
    pub fn remove(&self, step: RemovalStep, member: &MemberId) -> ToolCommand {
        let program = match step {
            RemovalStep::Lxd => "lxc",
            RemovalStep::MicroCeph => "microceph",
            RemovalStep::MicroOvn => "microovn",
            RemovalStep::MicroCloud => "microcloud",
        };

        self.command(program)
            .args(["cluster", "remove", member.as_str()])
    }

    /// Moves `snap` to `channel`.
    #[must_use]
    pub fn snap_refresh(&self, snap: &str, channel: &str) -> ToolCommand {
        self.command("snap")
            .arg("refresh")
            .arg(snap)
            .arg(format!("--channel={channel}"))
    }
}

/// Member names in the first column of `lxc cluster list --format csv`.
pub(crate) fn parse_cluster_members(csv: &str) -> Vec<String> {
    csv.lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_lines() {
        let tools = Tools::default();
        let member = MemberId::from("node-2");

        assert_eq!(tools.init().to_string(), "microcloud init --auto");
        assert_eq!(
            tools.remove(RemovalStep::MicroOvn, &member).to_string(),
            "microovn cluster remove node-2"
        );
        assert_eq!(
            tools.snap_refresh("lxd", "5.21/edge").to_string(),
            "snap refresh lxd --channel=5.21/edge"
        );
        assert_eq!(tools.add().timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_parse_cluster_members() {
        let csv = "node-1,https://10.0.0.1:8443,database,x86_64,default,,ONLINE,Fully operational\n\
                   node-2,https://10.0.0.2:8443,database,x86_64,default,,ONLINE,Fully operational\n";

        assert_eq!(parse_cluster_members(csv), vec!["node-1", "node-2"]);
        assert!(parse_cluster_members("").is_empty());
    }
}
