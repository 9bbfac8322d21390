//! The replicated `clustered` flag.

use std::fmt;

use tracing::warn;

/// Peer bag key holding a member's clustered flag.
pub const CLUSTERED_KEY: &str = "clustered";

/// A member's own account of whether it has joined the cluster.
///
/// Moves only `Unset -> False -> True` for a given member identity.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ClusteredFlag {
    /// The member has not announced itself yet.
    #[default]
    Unset,

    /// The member is present but not clustered.
    False,

    /// The member is part of the cluster.
    True,
}

impl ClusteredFlag {
    /// Parses the bag value. Unknown values read as `Unset`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "" => Self::Unset,
            "False" => Self::False,
            "True" => Self::True,
            other => {
                warn!("Unexpected clustered flag value '{}', treating it as unset", other);
                Self::Unset
            }
        }
    }

    /// The bag representation of this flag, `None` for `Unset`.
    #[must_use]
    pub const fn as_bag_value(self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::False => Some("False"),
            Self::True => Some("True"),
        }
    }

    /// Whether moving from `self` to `next` respects the flag's monotonic order.
    #[must_use]
    pub const fn may_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unset, _) | (Self::False, Self::False | Self::True) | (Self::True, Self::True)
        )
    }
}

impl fmt::Display for ClusteredFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_bag_value().unwrap_or("unset"))
    }
}
