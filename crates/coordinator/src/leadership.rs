/// Externally supplied leadership and intended group size.
///
/// Exactly one member of the group is leader at any time; electing it is not
/// this crate's concern.
pub trait Leadership
where
    Self: Send + Sync + 'static,
{
    /// Whether this member is the elected coordinator.
    fn is_leader(&self) -> bool;

    /// How many members the deployment intends to have.
    fn planned_units(&self) -> usize;
}

/// Fixed leadership answer, for callers that learn it once per evaluation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StaticLeadership {
    /// Whether this member is the leader.
    pub is_leader: bool,

    /// The intended group size.
    pub planned_units: usize,
}

impl Leadership for StaticLeadership {
    fn is_leader(&self) -> bool {
        self.is_leader
    }

    fn planned_units(&self) -> usize {
        self.planned_units
    }
}
