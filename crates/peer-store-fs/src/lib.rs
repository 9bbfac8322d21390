//! Implementation of the peer state bag using one JSON document per member
//! in a directory every member can read (for example a shared mount).
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use microcloud_peer_store::{MemberId, PeerStore};
use tokio::fs;
use tokio::io::{self, AsyncWriteExt};
use tracing::debug;

const ENTRY_EXTENSION: &str = "json";

type Entry = BTreeMap<String, String>;

/// Peer state bag stored as files on disk.
#[derive(Clone, Debug)]
pub struct FsPeerStore {
    dir: PathBuf,
}

impl FsPeerStore {
    /// Creates a new `FsPeerStore` rooted at the specified directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, member: &MemberId) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", member.as_str()))
    }

    async fn read_entry(&self, member: &MemberId) -> Result<Option<Entry>, Error> {
        let data = match fs::read(self.entry_path(member)).await {
            Ok(data) => data,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io("error reading peer entry", e)),
        };

        if data.is_empty() {
            return Ok(Some(Entry::new()));
        }

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| Error::Deserialize(member.to_string(), e))
    }
}

#[async_trait]
impl PeerStore for FsPeerStore {
    type Error = Error;

    async fn get(&self, member: &MemberId, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self
            .read_entry(member)
            .await?
            .and_then(|mut entry| entry.remove(key)))
    }

    async fn members(&self) -> Result<Vec<MemberId>, Self::Error> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io("error reading directory", e)),
        };
        let mut members = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Io("error reading directory entry", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                members.push(MemberId::from(stem));
            }
        }

        members.sort();
        Ok(members)
    }

    async fn put(&self, member: &MemberId, key: &str, value: String) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Io("error creating directory", e))?;

        let mut entry = self.read_entry(member).await?.unwrap_or_default();
        entry.insert(key.to_string(), value);
        let bytes = serde_json::to_vec_pretty(&entry).map_err(Error::Serialize)?;

        // Readers on other members must never observe a half-written document
        let path = self.entry_path(member);
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| Error::Io("error creating file", e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| Error::Io("error writing file", e))?;
        file.sync_all()
            .await
            .map_err(|e| Error::Io("error syncing file", e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Error::Io("error renaming file", e))?;

        debug!("wrote '{}' for {} to {}", key, member, path.display());
        Ok(())
    }
}
