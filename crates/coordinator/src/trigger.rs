use std::fmt;

use microcloud_peer_store::MemberId;

use crate::{Error, Phase, UnitStatus};

/// External event that starts an evaluation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Trigger {
    /// The member joined the peer group.
    RelationCreated,

    /// Operator configuration changed.
    ConfigChanged,

    /// The member was started.
    Start,

    /// Another unit appeared in the peer group.
    RelationJoined {
        /// The unit that appeared.
        unit: MemberId,
    },

    /// Periodic health tick.
    UpdateStatus,

    /// The member is being shut down and should leave the cluster.
    Stop,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelationCreated => f.write_str("relation-created"),
            Self::ConfigChanged => f.write_str("config-changed"),
            Self::Start => f.write_str("start"),
            Self::RelationJoined { unit } => write!(f, "relation-joined({unit})"),
            Self::UpdateStatus => f.write_str("update-status"),
            Self::Stop => f.write_str("stop"),
        }
    }
}

/// Result of one evaluation.
#[derive(Debug)]
pub struct Outcome {
    /// The member's phase after the evaluation.
    pub phase: Phase,

    /// Last status published, if the evaluation published one.
    pub status: Option<UnitStatus>,

    /// Whether the trigger should be re-delivered later.
    pub deferred: bool,

    /// The condition that ended the evaluation early, if any.
    pub condition: Option<Error>,
}

impl Outcome {
    pub(crate) const fn new(phase: Phase) -> Self {
        Self {
            phase,
            status: None,
            deferred: false,
            condition: None,
        }
    }

    pub(crate) fn with_status(mut self, status: UnitStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) const fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    pub(crate) fn with_condition(mut self, condition: Error) -> Self {
        self.condition = Some(condition);
        self
    }
}
