//! Member-local state kept between invocations.

use std::path::{Path, PathBuf};

use microcloud_coordinator::{CharmConfig, ConfigSnapshot};
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

const SNAPSHOT_FILE: &str = "local-state.json";
const STATUS_FILE: &str = "status.json";

/// Directory holding the applied configuration and the published status.
#[derive(Clone, Debug)]
pub struct LocalState {
    dir: PathBuf,
}

impl LocalState {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the unit status is published.
    pub fn status_path(&self) -> PathBuf {
        self.dir.join(STATUS_FILE)
    }

    /// The configuration applied by an earlier invocation, if any.
    pub async fn load_snapshot(&self) -> Result<Option<ConfigSnapshot>> {
        let path = self.dir.join(SNAPSHOT_FILE);

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no applied configuration at {:?}", path);
                Ok(None)
            }
            Err(e) => Err(Error::Io("failed to read local state", e)),
        }
    }

    pub async fn save_snapshot(&self, snapshot: &ConfigSnapshot) -> Result<()> {
        write_atomically(&self.dir.join(SNAPSHOT_FILE), &serde_json::to_vec_pretty(snapshot)?)
            .await
    }
}

/// Reads the operator configuration, falling back to defaults for absent keys.
pub async fn load_config(path: &Path) -> Result<CharmConfig> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| Error::Io("failed to read configuration", e))?;

    serde_json::from_slice(&bytes).map_err(|e| Error::Config(path.to_path_buf(), e))
}

pub async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Io("failed to create state directory", e))?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)
        .await
        .map_err(|e| Error::Io("failed to write state file", e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::Io("failed to replace state file", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let state = LocalState::new(dir.path().join("state"));

        assert!(state.load_snapshot().await.unwrap().is_none());

        let snapshot = CharmConfig {
            microceph: true,
            ..CharmConfig::default()
        };
        state.save_snapshot(&snapshot).await.unwrap();

        assert_eq!(state.load_snapshot().await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn test_load_config_rejects_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config(&path).await, Err(Error::Config(..))));
    }

    #[tokio::test]
    async fn test_load_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"microovn": true}"#).unwrap();

        let config = load_config(&path).await.unwrap();

        assert!(config.microovn);
        assert_eq!(config.snap_channel_lxd, "5.21/stable");
    }
}
