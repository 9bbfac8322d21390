use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Coordinator error
    #[error(transparent)]
    Coordinator(#[from] microcloud_coordinator::Error),

    /// The operator configuration could not be parsed.
    #[error("invalid configuration file {0:?}: {1}")]
    Config(PathBuf, #[source] serde_json::Error),

    /// Could not determine the hostname.
    #[error("could not determine hostname: {0}")]
    Hostname(#[from] nix::Error),

    /// IO error
    #[error("IO error: {0} - {1}")]
    Io(&'static str, #[source] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Could not set global default subscriber.
    #[error("could not set global default subscriber: {0}")]
    SetTracing(#[from] tracing::dispatcher::SetGlobalDefaultError),
}
