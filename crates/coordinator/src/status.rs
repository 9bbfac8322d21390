//! Externally observable unit status.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Status shown to operators.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum UnitStatus {
    /// Healthy and clustered.
    Active(String),

    /// Waiting on peers; safe to retry later.
    Waiting(String),

    /// An operation is in progress.
    Maintenance(String),

    /// Requires operator intervention.
    Blocked(String),
}

impl UnitStatus {
    /// The human readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Active(message)
            | Self::Waiting(message)
            | Self::Maintenance(message)
            | Self::Blocked(message) => message,
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Active(_) => "active",
            Self::Waiting(_) => "waiting",
            Self::Maintenance(_) => "maintenance",
            Self::Blocked(_) => "blocked",
        };

        write!(f, "{kind}: {}", self.message())
    }
}

/// Destination of status updates.
#[async_trait]
pub trait StatusSink
where
    Self: Send + Sync + 'static,
{
    /// Publishes `status`, replacing the previous one.
    async fn set_status(
        &self,
        status: &UnitStatus,
    ) -> Result<(), Box<dyn StdError + Send + Sync>>;
}

/// Publishes statuses to a sink and mirrors them into the log.
#[derive(Clone, Debug)]
pub struct StatusReporter<K> {
    sink: K,
}

impl<K> StatusReporter<K>
where
    K: StatusSink,
{
    /// Creates a reporter publishing to `sink`.
    pub const fn new(sink: K) -> Self {
        Self { sink }
    }

    /// Logs `status` at its severity and publishes it.
    ///
    /// A sink failure is logged and otherwise ignored.
    pub async fn report(&self, status: &UnitStatus) {
        match status {
            UnitStatus::Active(message) => debug!("{}", message),
            UnitStatus::Waiting(message) | UnitStatus::Maintenance(message) => {
                info!("{}", message);
            }
            UnitStatus::Blocked(message) => error!("{}", message),
        }

        if let Err(e) = self.sink.set_status(status).await {
            warn!("failed to publish unit status '{}': {}", status, e);
        }
    }
}

/// In-memory sink that keeps every status it receives.
#[derive(Clone, Debug, Default)]
pub struct MemoryStatusSink {
    history: Arc<Mutex<Vec<UnitStatus>>>,
}

impl MemoryStatusSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status received, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<UnitStatus> {
        self.history.lock().clone()
    }

    /// The latest status, if any.
    #[must_use]
    pub fn current(&self) -> Option<UnitStatus> {
        self.history.lock().last().cloned()
    }
}

#[async_trait]
impl StatusSink for MemoryStatusSink {
    async fn set_status(
        &self,
        status: &UnitStatus,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        self.history.lock().push(status.clone());
        Ok(())
    }
}
