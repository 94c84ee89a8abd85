//! Resource handles.
//!
//! A resource handle is whatever the host picked for a book: a file inside a
//! user-chosen folder, a document-provider URI, or bytes already in memory.
//! The core only ever asks it for the full encoded payload.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Yields the raw (still encoded) bytes of an audio resource on demand.
#[async_trait]
pub trait ResourceHandle: Send + Sync {
    /// Read the complete encoded payload.
    async fn get_bytes(&self) -> Result<Bytes>;

    /// Short description for logs. Must not contain full paths.
    fn describe(&self) -> String {
        "resource".to_string()
    }
}

/// Resource backed by a buffer already held in memory.
#[derive(Debug, Clone)]
pub struct MemoryResource {
    name: String,
    data: Bytes,
}

impl MemoryResource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl ResourceHandle for MemoryResource {
    async fn get_bytes(&self) -> Result<Bytes> {
        Ok(self.data.clone())
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}
