//! In-memory implementation of the peer state bag, shared by every handle
//! cloned from the same store. Used to simulate a group of members inside a
//! single process.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use microcloud_peer_store::{MemberId, PeerStore};
use tokio::sync::Mutex;

/// In-memory peer state bag.
#[derive(Clone, Debug, Default)]
pub struct MemoryPeerStore {
    entries: Arc<Mutex<BTreeMap<MemberId, HashMap<String, String>>>>,
}

impl MemoryPeerStore {
    /// Creates a new, empty `MemoryPeerStore`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty entry for `member`, as if it had just joined the group.
    pub async fn add_member(&self, member: &MemberId) {
        self.entries
            .lock()
            .await
            .entry(member.clone())
            .or_default();
    }

    /// Drops `member`'s entry, as if it had left the group.
    pub async fn remove_member(&self, member: &MemberId) {
        self.entries.lock().await.remove(member);
    }
}

#[async_trait]
impl PeerStore for MemoryPeerStore {
    type Error = Error;

    async fn get(&self, member: &MemberId, key: &str) -> Result<Option<String>, Self::Error> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(member)
            .and_then(|entry| entry.get(key))
            .cloned())
    }

    async fn members(&self) -> Result<Vec<MemberId>, Self::Error> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn put(&self, member: &MemberId, key: &str, value: String) -> Result<(), Self::Error> {
        self.entries
            .lock()
            .await
            .entry(member.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}
