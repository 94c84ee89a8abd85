//! File-backed resource handles using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    resource::ResourceHandle,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Audio resource stored as a file on the local disk.
///
/// The whole file is read on every `get_bytes` call; nothing is cached.
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file on disk in bytes.
    pub async fn size(&self) -> Result<u64> {
        let metadata = fs::metadata(&self.path).await.map_err(BridgeError::Io)?;
        Ok(metadata.len())
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string())
    }
}

#[async_trait]
impl ResourceHandle for FileResource {
    async fn get_bytes(&self) -> Result<Bytes> {
        let data = fs::read(&self.path).await.map_err(BridgeError::Io)?;
        debug!(file = %self.file_name(), size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.file_name())
    }
}
