//! Abstract interface for the replicated peer state bag shared by all members.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod bag;
mod member_id;

pub use bag::PeerBag;
pub use member_id::MemberId;

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;

/// Marker trait for `PeerStore` errors
pub trait PeerStoreError: Debug + Error + Send + Sync {}

/// A replicated, eventually-consistent bag of per-member string entries.
///
/// Backends make no ordering promise across members: a read may return a
/// value that a peer has already overwritten. Writes for a member must only
/// ever come from that member, which [`PeerBag`] enforces for callers.
///
/// # Required Methods
/// - `get`: Reads one key from a member's entry.
/// - `members`: Lists every member that has an entry.
/// - `put`: Writes one key into a member's entry.
#[async_trait]
pub trait PeerStore: Clone + Send + Sync + 'static {
    /// The error type for this store.
    type Error: PeerStoreError;

    /// Reads `key` from the entry of `member`.
    async fn get(&self, member: &MemberId, key: &str) -> Result<Option<String>, Self::Error>;

    /// Lists all members with an entry in the bag.
    async fn members(&self) -> Result<Vec<MemberId>, Self::Error>;

    /// Writes `key` into the entry of `member`.
    async fn put(&self, member: &MemberId, key: &str, value: String) -> Result<(), Self::Error>;
}
