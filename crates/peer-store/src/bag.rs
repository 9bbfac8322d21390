//! Own-entry accessor over a [`PeerStore`].

use tracing::warn;

use crate::{MemberId, PeerStore};

/// Access to the peer state bag on behalf of one member.
///
/// Reads may target any member. Writes always target the owning member: there
/// is no method that takes a foreign [`MemberId`] for writing.
#[derive(Clone, Debug)]
pub struct PeerBag<S>
where
    S: PeerStore,
{
    owner: MemberId,
    store: S,
}

impl<S> PeerBag<S>
where
    S: PeerStore,
{
    /// Creates an accessor for `owner` over `store`.
    pub const fn new(store: S, owner: MemberId) -> Self {
        Self { owner, store }
    }

    /// The member this accessor writes for.
    #[must_use]
    pub const fn owner(&self) -> &MemberId {
        &self.owner
    }

    /// Reads `key` from `member`'s entry.
    ///
    /// Returns an empty string when the key is absent or the read fails.
    pub async fn get(&self, member: &MemberId, key: &str) -> String {
        if key.is_empty() {
            return String::new();
        }

        match self.store.get(member, key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!("Invalid data pulled out of {}'s entry for '{}': {}", member, key, e);
                String::new()
            }
        }
    }

    /// Reads `key` from the owner's entry.
    pub async fn get_own(&self, key: &str) -> String {
        self.get(&self.owner, key).await
    }

    /// Writes `key` into the owner's entry unless it already holds `value`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), S::Error> {
        if key.is_empty() {
            return Ok(());
        }

        if self.get_own(key).await == value {
            return Ok(());
        }

        self.store.put(&self.owner, key, value.to_string()).await
    }

    /// Lists every member with an entry, the owner included.
    pub async fn members(&self) -> Vec<MemberId> {
        match self.store.members().await {
            Ok(members) => members,
            Err(e) => {
                warn!("Failed to list peer bag members: {}", e);
                Vec::new()
            }
        }
    }

    /// Lists every member with an entry except the owner.
    pub async fn peers(&self) -> Vec<MemberId> {
        self.members()
            .await
            .into_iter()
            .filter(|member| member != &self.owner)
            .collect()
    }
}
