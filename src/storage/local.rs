use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::TryStreamExt;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::{ByteStream, StorageProvider, StoredBlob};

/// Local file system storage provider
///
/// All blobs live directly under the managed root directory; nothing outside
/// it is ever read or deleted.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolve a blob name inside the managed root. Names with parent or
    /// absolute components are rejected outright.
    fn full_path(&self, path: &str) -> Result<PathBuf> {
        let ok = !path.is_empty()
            && Path::new(path)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !ok {
            return Err(AppError::Storage(format!("Invalid blob path: {}", path)));
        }
        Ok(self.base_path.join(path))
    }

    /// Allocate a physical name that cannot collide: millisecond timestamp
    /// plus a random UUID
    fn allocate_name() -> String {
        format!("{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4())
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put_stream(&self, mut stream: ByteStream<'_>) -> Result<StoredBlob> {
        fs::create_dir_all(&self.base_path).await?;

        let name = Self::allocate_name();
        let full_path = self.base_path.join(&name);

        // create_new guards against ever clobbering an existing blob
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await?;

        let mut size: i64 = 0;
        let write_result: Result<()> = async {
            while let Some(chunk) = stream.try_next().await? {
                file.write_all(&chunk).await?;
                size += chunk.len() as i64;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        match write_result {
            Ok(()) => {
                tracing::debug!("Saved blob to {:?} ({} bytes)", full_path, size);
                Ok(StoredBlob { path: name, size })
            }
            Err(e) => {
                // The partial file must not outlive the failed write
                drop(file);
                if let Err(cleanup) = fs::remove_file(&full_path).await {
                    tracing::error!(
                        "Failed to remove partial blob {:?}: {}",
                        full_path,
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    async fn open(&self, path: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let full_path = self.full_path(path)?;

        let file = fs::File::open(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("File not found: {}", path))
            } else {
                AppError::Storage(format!("Failed to open file: {}", e))
            }
        })?;

        Ok(Box::new(file))
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        let full_path = self.full_path(path)?;

        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("File not found: {}", path))
            } else {
                AppError::Storage(format!("Failed to read file: {}", e))
            }
        })?;

        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted blob {:?}", full_path);
                Ok(())
            }
            // Idempotent: the caller decides whether absence matters
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to delete file: {}",
                e
            ))),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.full_path(path)?;

        match fs::metadata(&full_path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Storage(format!("Failed to stat file: {}", e))),
        }
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
