//! Role resolution from the peer bag and a health probe.

use std::collections::BTreeMap;
use std::fmt;

use microcloud_peer_store::MemberId;

use crate::ClusteredFlag;

/// One member's view of the group for a single evaluation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterView {
    /// The evaluating member.
    pub member: MemberId,

    /// Whether the evaluating member is leader.
    pub is_leader: bool,

    /// Intended group size.
    pub planned_units: usize,

    /// Clustered flag of every known member, the evaluating member included.
    pub flags: BTreeMap<MemberId, ClusteredFlag>,
}

impl ClusterView {
    /// The evaluating member's own flag.
    #[must_use]
    pub fn own_flag(&self) -> ClusteredFlag {
        self.flag_of(&self.member)
    }

    /// Flag of `member`, `Unset` if the member is unknown.
    #[must_use]
    pub fn flag_of(&self, member: &MemberId) -> ClusteredFlag {
        self.flags.get(member).copied().unwrap_or_default()
    }

    /// Known members other than the evaluating one.
    pub fn peers(&self) -> impl Iterator<Item = (&MemberId, ClusteredFlag)> {
        self.flags
            .iter()
            .filter(|(member, _)| *member != &self.member)
            .map(|(member, flag)| (member, *flag))
    }

    /// Whether any known member reports itself clustered.
    #[must_use]
    pub fn any_clustered(&self) -> bool {
        self.flags.values().any(|flag| *flag == ClusteredFlag::True)
    }
}

/// What the evaluation was triggered for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Evaluation {
    /// Decide whether to form the cluster.
    Bootstrap,

    /// A unit appeared in the group and may need adding to the cluster.
    Enroll {
        /// The unit that appeared.
        unit: MemberId,
    },

    /// Periodic health re-check.
    Verify,
}

/// Result of a successful health probe of the clustering tool.
///
/// For [`Evaluation::Enroll`] the subject is the unit being enrolled,
/// otherwise it is the evaluating member.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Probe {
    /// The subject is a cluster member.
    Healthy,

    /// The subject is not a cluster member.
    Unhealthy,
}

/// Why an evaluation decided to do nothing yet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WaitReason {
    /// A cluster exists; this member waits for the leader to add it.
    AwaitingEnrollment,

    /// Not the leader; the leader forms the cluster.
    AwaitingLeader,

    /// Not every intended member is present yet.
    AwaitingQuorum {
        /// Members present, the evaluating one included.
        present: usize,

        /// Intended group size.
        planned: usize,
    },

    /// Nobody is clustered and this member does not claim to be.
    Bootstrapping,

    /// The leader has not joined the cluster itself.
    LeaderNotClustered,

    /// Only the leader enrolls new units.
    NotLeader,

    /// The evaluating member has not announced itself in the bag yet.
    NotRegistered,

    /// At least one peer has not announced itself yet.
    PeersNotReady,

    /// The unit is already in the cluster.
    UnitAlreadyMember,
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingEnrollment => f.write_str("waiting to be added to the cluster"),
            Self::AwaitingLeader => f.write_str("waiting for the leader to bootstrap"),
            Self::AwaitingQuorum { present, planned } => {
                write!(f, "{present} of {planned} units present")
            }
            Self::Bootstrapping => f.write_str("cluster not bootstrapped yet"),
            Self::LeaderNotClustered => f.write_str("leader is not clustered"),
            Self::NotLeader => f.write_str("not the leader"),
            Self::NotRegistered => f.write_str("this unit has not registered with its peers"),
            Self::PeersNotReady => f.write_str("some peers have not registered yet"),
            Self::UnitAlreadyMember => f.write_str("unit is already a cluster member"),
        }
    }
}

/// What the evaluating member should do.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Role {
    /// Nothing to do yet.
    NotReady(WaitReason),

    /// Form the cluster.
    ShouldInitialize,

    /// Add this unit to the existing cluster.
    ShouldJoin(MemberId),

    /// The subject is already clustered.
    AlreadyClustered,

    /// The member claims membership but its health probe failed.
    ShouldVerify,
}

/// Resolves the role of `view.member` for `evaluation`.
///
/// A healthy probe takes precedence over anything the bag says, since the bag
/// may lag the clustering tool.
#[must_use]
pub fn resolve(view: &ClusterView, evaluation: &Evaluation, probe: Probe) -> Role {
    if probe == Probe::Healthy {
        return Role::AlreadyClustered;
    }

    match evaluation {
        Evaluation::Enroll { unit } => resolve_enrollment(view, unit),
        Evaluation::Verify => {
            if view.own_flag() == ClusteredFlag::True {
                Role::ShouldVerify
            } else if view.any_clustered() {
                Role::NotReady(WaitReason::AwaitingEnrollment)
            } else {
                Role::NotReady(WaitReason::Bootstrapping)
            }
        }
        Evaluation::Bootstrap => resolve_bootstrap(view),
    }
}

fn resolve_enrollment(view: &ClusterView, unit: &MemberId) -> Role {
    if !view.is_leader {
        return Role::NotReady(WaitReason::NotLeader);
    }

    if view.own_flag() != ClusteredFlag::True {
        return Role::NotReady(WaitReason::LeaderNotClustered);
    }

    if unit == &view.member || view.flag_of(unit) == ClusteredFlag::True {
        return Role::NotReady(WaitReason::UnitAlreadyMember);
    }

    Role::ShouldJoin(unit.clone())
}

fn resolve_bootstrap(view: &ClusterView) -> Role {
    // Never form a second cluster next to an existing one
    if view.any_clustered() {
        return Role::NotReady(WaitReason::AwaitingEnrollment);
    }

    if !view.is_leader {
        return Role::NotReady(WaitReason::AwaitingLeader);
    }

    if view.own_flag() != ClusteredFlag::False {
        return Role::NotReady(WaitReason::NotRegistered);
    }

    if !view.peers().all(|(_, flag)| flag == ClusteredFlag::False) {
        return Role::NotReady(WaitReason::PeersNotReady);
    }

    let present = view.peers().count() + 1;
    if present != view.planned_units {
        return Role::NotReady(WaitReason::AwaitingQuorum {
            present,
            planned: view.planned_units,
        });
    }

    Role::ShouldInitialize
}
