use serde::Serialize;
use sqlx::FromRow;

/// Document model - one metadata record per stored blob
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: String,
    /// Original client-supplied name, stored verbatim; never used as a
    /// storage key
    pub filename: String,
    /// Blob name relative to the managed storage root
    pub filepath: String,
    pub filesize: i64,
    /// Hex SHA-256 of the stored bytes; unique across all live records
    pub filehash: String,
    pub created_at: String,
}

/// Document response without storage internals
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub filename: String,
    pub filesize: i64,
    pub created_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename,
            filesize: doc.filesize,
            created_at: doc.created_at,
        }
    }
}

/// Document list response
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
}

/// Identity of the record that already owns a content hash, returned with a
/// duplicate rejection
#[derive(Debug, Clone, Serialize)]
pub struct ExistingDocument {
    pub id: String,
    pub filename: String,
    pub created_at: String,
}

impl From<&Document> for ExistingDocument {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            filename: doc.filename.clone(),
            created_at: doc.created_at.clone(),
        }
    }
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
