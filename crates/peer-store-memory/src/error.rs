use microcloud_peer_store::PeerStoreError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("peer store error")]
pub struct Error;

impl PeerStoreError for Error {}
