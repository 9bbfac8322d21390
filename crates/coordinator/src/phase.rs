use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ClusteredFlag, Probe};

/// Lifecycle phase of a member, derived anew for every evaluation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Not part of the cluster.
    Unclustered,

    /// Forming the cluster.
    Initializing,

    /// Being added to the cluster.
    Joining,

    /// Part of a healthy cluster.
    Clustered,

    /// Removing itself from the cluster.
    Leaving,

    /// Removed from the cluster.
    Removed,

    /// Needs operator intervention.
    Blocked,
}

impl Phase {
    /// Phase implied by the member's own flag and its latest probe.
    #[must_use]
    pub fn derive(own_flag: ClusteredFlag, probe: Probe) -> Self {
        match (probe, own_flag) {
            (Probe::Healthy, _) => Self::Clustered,
            (Probe::Unhealthy, ClusteredFlag::True) => Self::Blocked,
            (Probe::Unhealthy, _) => Self::Unclustered,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unclustered => "unclustered",
            Self::Initializing => "initializing",
            Self::Joining => "joining",
            Self::Clustered => "clustered",
            Self::Leaving => "leaving",
            Self::Removed => "removed",
            Self::Blocked => "blocked",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive() {
        assert_eq!(
            Phase::derive(ClusteredFlag::False, Probe::Healthy),
            Phase::Clustered
        );
        assert_eq!(
            Phase::derive(ClusteredFlag::True, Probe::Unhealthy),
            Phase::Blocked
        );
        assert_eq!(
            Phase::derive(ClusteredFlag::Unset, Probe::Unhealthy),
            Phase::Unclustered
        );
    }
}
