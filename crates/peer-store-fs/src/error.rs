use microcloud_peer_store::PeerStoreError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Deserialization error.
    #[error("deserialization error for {0}: {1}")]
    Deserialize(String, #[source] serde_json::Error),

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl PeerStoreError for Error {}
