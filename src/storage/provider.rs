use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio::io::AsyncRead;

use crate::error::Result;

/// Byte stream fed into the blob store by an upload
pub type ByteStream<'a> = BoxStream<'a, Result<Bytes>>;

/// A blob freshly written by `put_stream`
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Physical name relative to the managed storage root
    pub path: String,
    /// Bytes written
    pub size: i64,
}

/// Storage provider trait
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Write a stream to a freshly allocated unique physical location and
    /// return where it landed. A partial file must not survive a failed
    /// write, and an existing blob is never overwritten.
    async fn put_stream(&self, stream: ByteStream<'_>) -> Result<StoredBlob>;

    /// Open a blob for streaming reads; fails NotFound if absent
    async fn open(&self, path: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// Read a whole blob into memory; fails NotFound if absent
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Delete a blob; deleting an already-absent path is not an error at
    /// this layer
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if a blob exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}
