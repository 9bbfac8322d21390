use std::error::Error as StdError;
use std::path::PathBuf;

use async_trait::async_trait;
use microcloud_coordinator::{StatusSink, UnitStatus};

use crate::state::write_atomically;

/// Publishes the unit status as a JSON document.
#[derive(Clone, Debug)]
pub struct FileStatusSink {
    path: PathBuf,
}

impl FileStatusSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StatusSink for FileStatusSink {
    async fn set_status(
        &self,
        status: &UnitStatus,
    ) -> Result<(), Box<dyn StdError + Send + Sync>> {
        let contents = serde_json::to_vec_pretty(status)?;
        write_atomically(&self.path, &contents).await?;

        Ok(())
    }
}
