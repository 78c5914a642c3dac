use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::hash;
use crate::models::{Document, ExistingDocument};
use crate::services::DocumentRegistry;
use crate::storage::{ByteStream, StorageProvider, StoredBlob};

/// Document service - drives an upload from byte stream to registered record
pub struct DocumentService;

impl DocumentService {
    /// Ingest an upload.
    ///
    /// The stream is written to the blob store first and fingerprinted from
    /// the stored bytes, so the hash always reflects exactly what sits on
    /// disk. Afterwards the record is registered, and whatever goes wrong
    /// past the write - duplicate content, a lost insert race, an IO or
    /// database failure - the just-written blob is removed before the error
    /// is returned.
    pub async fn ingest(
        db: &Database,
        storage: &dyn StorageProvider,
        upload: &UploadConfig,
        filename: String,
        content_type: Option<&str>,
        stream: ByteStream<'_>,
    ) -> Result<Document> {
        // Fail fast before anything touches the disk
        let declared = content_type
            .ok_or_else(|| AppError::InvalidInput("Missing content type".to_string()))?;
        if !upload.accepts(declared) {
            return Err(AppError::InvalidInput(
                "Only PDF files are allowed".to_string(),
            ));
        }
        if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
            return Err(AppError::InvalidInput("Invalid file name".to_string()));
        }

        let blob = storage
            .put_stream(Self::bounded(stream, upload.max_size_bytes))
            .await?;

        match Self::register(db, storage, filename, &blob).await {
            Ok(doc) => {
                tracing::info!(
                    "Registered document {} ({} bytes, hash {})",
                    doc.id,
                    doc.filesize,
                    doc.filehash
                );
                Ok(doc)
            }
            Err(err) => {
                // No blob survives a failed ingestion
                if let Err(cleanup) = storage.delete(&blob.path).await {
                    tracing::error!("Failed to clean up blob {}: {}", blob.path, cleanup);
                }
                Err(err)
            }
        }
    }

    /// Cap a stream at `max_size` bytes; exceeding the cap aborts the write
    /// mid-stream instead of letting an oversized blob land
    fn bounded(stream: ByteStream<'_>, max_size: u64) -> ByteStream<'_> {
        let mut total: u64 = 0;
        stream
            .map(move |chunk| {
                let chunk = chunk?;
                total += chunk.len() as u64;
                if total > max_size {
                    return Err(AppError::InvalidInput(format!(
                        "File size exceeds {} byte limit",
                        max_size
                    )));
                }
                Ok(chunk)
            })
            .boxed()
    }

    /// Fingerprint the stored bytes and claim the hash in the registry
    async fn register(
        db: &Database,
        storage: &dyn StorageProvider,
        filename: String,
        blob: &StoredBlob,
    ) -> Result<Document> {
        // Hash what was actually persisted, not the in-flight stream
        let reader = storage.open(&blob.path).await?;
        let filehash = hash::digest_reader(reader).await?;

        if let Some(existing) = DocumentRegistry::find_by_hash(db, &filehash).await? {
            return Err(AppError::Duplicate(ExistingDocument::from(&existing)));
        }

        let doc = Document {
            id: Uuid::new_v4().to_string(),
            filename,
            filepath: blob.path.clone(),
            filesize: blob.size,
            filehash,
            created_at: Utc::now().to_rfc3339(),
        };

        match DocumentRegistry::insert(db, &doc).await {
            Ok(()) => Ok(doc),
            // Lost the race against a concurrent identical upload; the
            // winning record answers for this content from now on
            Err(AppError::DuplicateHash) => {
                match DocumentRegistry::find_by_hash(db, &doc.filehash).await? {
                    Some(winner) => Err(AppError::Duplicate(ExistingDocument::from(&winner))),
                    None => Err(AppError::DuplicateHash),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// All live records, newest first
    pub async fn list_documents(db: &Database) -> Result<Vec<Document>> {
        DocumentRegistry::list_all(db).await
    }

    pub async fn get_document(db: &Database, id: &str) -> Result<Document> {
        DocumentRegistry::find_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Document not found".to_string()))
    }

    /// Fetch a record together with its stored bytes. A record whose blob
    /// went missing is reported, never silently substituted.
    pub async fn get_for_download(
        db: &Database,
        storage: &dyn StorageProvider,
        id: &str,
    ) -> Result<(Document, Bytes)> {
        let doc = Self::get_document(db, id).await?;

        if !storage.exists(&doc.filepath).await? {
            tracing::warn!(
                "Document {} references missing blob {}",
                doc.id,
                doc.filepath
            );
            return Err(AppError::NotFound("File not found on disk".to_string()));
        }

        let data = storage.get(&doc.filepath).await?;
        Ok((doc, data))
    }

    /// Delete a document: blob first, then the record. Blob removal is
    /// best-effort - a blob that is already gone, or refuses to go, must not
    /// strand the record.
    pub async fn delete_document(
        db: &Database,
        storage: &dyn StorageProvider,
        id: &str,
    ) -> Result<()> {
        let doc = Self::get_document(db, id).await?;

        if let Err(e) = storage.delete(&doc.filepath).await {
            tracing::warn!("Failed to delete blob {}: {}", doc.filepath, e);
        }

        if !DocumentRegistry::delete_by_id(db, &doc.id).await? {
            return Err(AppError::NotFound("Document not found".to_string()));
        }

        tracing::info!("Deleted document {}", doc.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use std::sync::Arc;

    struct TestEnv {
        db: Database,
        storage: Arc<LocalStorage>,
        upload: UploadConfig,
        _dir: tempfile::TempDir,
        blob_dir: std::path::PathBuf,
    }

    async fn test_env() -> TestEnv {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let blob_dir = dir.path().join("blobs");

        let db = Database::new(db_path.to_str().unwrap()).await.unwrap();
        db.run_migrations().await.unwrap();

        TestEnv {
            db,
            storage: Arc::new(LocalStorage::new(&blob_dir)),
            upload: UploadConfig::default(),
            _dir: dir,
            blob_dir,
        }
    }

    fn pdf_stream(content: &[u8]) -> ByteStream<'static> {
        let chunks: Vec<Result<Bytes>> = content
            .chunks(4)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        futures::stream::iter(chunks).boxed()
    }

    fn blob_count(env: &TestEnv) -> usize {
        match std::fs::read_dir(&env.blob_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    async fn ingest(env: &TestEnv, name: &str, content: &[u8]) -> Result<Document> {
        DocumentService::ingest(
            &env.db,
            env.storage.as_ref(),
            &env.upload,
            name.to_string(),
            Some("application/pdf"),
            pdf_stream(content),
        )
        .await
    }

    #[tokio::test]
    async fn test_upload_registers_record_and_blob() {
        let env = test_env().await;

        let doc = ingest(&env, "a.pdf", b"hello").await.unwrap();

        assert_eq!(doc.filename, "a.pdf");
        assert_eq!(doc.filesize, 5);
        assert_eq!(
            doc.filehash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(blob_count(&env), 1);

        let (fetched, data) =
            DocumentService::get_for_download(&env.db, env.storage.as_ref(), &doc.id)
                .await
                .unwrap();
        assert_eq!(fetched.id, doc.id);
        assert_eq!(&data[..], b"hello");
    }

    #[tokio::test]
    async fn test_identical_content_is_rejected_even_under_a_new_name() {
        let env = test_env().await;

        let first = ingest(&env, "a.pdf", b"hello").await.unwrap();
        let second = ingest(&env, "b.pdf", b"hello").await;

        match second {
            Err(AppError::Duplicate(existing)) => {
                assert_eq!(existing.id, first.id);
                assert_eq!(existing.filename, "a.pdf");
            }
            other => panic!("Expected duplicate rejection, got {:?}", other.map(|d| d.id)),
        }

        // Exactly one blob and one record survive
        assert_eq!(blob_count(&env), 1);
        assert_eq!(
            DocumentService::list_documents(&env.db).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_distinct_contents_get_distinct_records() {
        let env = test_env().await;

        let a = ingest(&env, "a.pdf", b"content A").await.unwrap();
        let b = ingest(&env, "b.pdf", b"content B").await.unwrap();

        assert_ne!(a.filehash, b.filehash);
        assert_ne!(a.filepath, b.filepath);
        assert_eq!(blob_count(&env), 2);
    }

    #[tokio::test]
    async fn test_wrong_content_type_writes_nothing() {
        let env = test_env().await;

        let result = DocumentService::ingest(
            &env.db,
            env.storage.as_ref(),
            &env.upload,
            "notes.txt".to_string(),
            Some("text/plain"),
            pdf_stream(b"plain text"),
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(blob_count(&env), 0);
    }

    #[tokio::test]
    async fn test_missing_content_type_writes_nothing() {
        let env = test_env().await;

        let result = DocumentService::ingest(
            &env.db,
            env.storage.as_ref(),
            &env.upload,
            "mystery.pdf".to_string(),
            None,
            pdf_stream(b"bytes"),
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(blob_count(&env), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_leaves_no_blob_behind() {
        let mut env = test_env().await;
        env.upload.max_size_bytes = 16;

        let result = ingest(&env, "big.pdf", &[0u8; 64]).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(blob_count(&env), 0);
        assert!(DocumentService::list_documents(&env.db)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_record() {
        let env = test_env().await;

        let doc = ingest(&env, "a.pdf", b"hello").await.unwrap();
        DocumentService::delete_document(&env.db, env.storage.as_ref(), &doc.id)
            .await
            .unwrap();

        assert_eq!(blob_count(&env), 0);
        let gone = DocumentService::get_document(&env.db, &doc.id).await;
        assert!(matches!(gone, Err(AppError::NotFound(_))));

        // The content can be uploaded again afterwards
        ingest(&env, "a.pdf", b"hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let env = test_env().await;

        let result =
            DocumentService::delete_document(&env.db, env.storage.as_ref(), "no-such-id").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_blob_is_reported_not_substituted() {
        let env = test_env().await;

        let doc = ingest(&env, "a.pdf", b"hello").await.unwrap();
        env.storage.delete(&doc.filepath).await.unwrap();

        let result =
            DocumentService::get_for_download(&env.db, env.storage.as_ref(), &doc.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_identical_uploads_leave_one_record() {
        let env = test_env().await;
        let storage: Arc<dyn StorageProvider> = env.storage.clone();

        let mut handles = Vec::new();
        for i in 0..4 {
            let db = env.db.clone();
            let storage = storage.clone();
            let upload = env.upload.clone();
            handles.push(tokio::spawn(async move {
                DocumentService::ingest(
                    &db,
                    storage.as_ref(),
                    &upload,
                    format!("copy-{}.pdf", i),
                    Some("application/pdf"),
                    pdf_stream(b"identical bytes"),
                )
                .await
            }));
        }

        let mut winners = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(AppError::Duplicate(_)) | Err(AppError::DuplicateHash) => duplicates += 1,
                Err(e) => panic!("Unexpected error: {:?}", e),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(duplicates, 3);
        assert_eq!(blob_count(&env), 1);
        assert_eq!(
            DocumentService::list_documents(&env.db).await.unwrap().len(),
            1
        );
    }
}
