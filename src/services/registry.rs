use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::Document;

/// Document registry - the metadata record store.
///
/// Deduplication correctness lives here: the database enforces a unique
/// index on `filehash`, so two uploads racing past the duplicate pre-check
/// cannot both insert.
pub struct DocumentRegistry;

impl DocumentRegistry {
    pub async fn find_by_hash(db: &Database, filehash: &str) -> Result<Option<Document>> {
        let doc = sqlx::query_as("SELECT * FROM documents WHERE filehash = ?")
            .bind(filehash)
            .fetch_optional(db.pool())
            .await?;
        Ok(doc)
    }

    pub async fn find_by_id(db: &Database, id: &str) -> Result<Option<Document>> {
        let doc = sqlx::query_as("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(db.pool())
            .await?;
        Ok(doc)
    }

    /// Insert a new record. A unique-index violation on `filehash` means a
    /// concurrent upload of identical content won the race; that surfaces as
    /// `DuplicateHash` for the caller to translate, not as a database error.
    pub async fn insert(db: &Database, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, filename, filepath, filesize, filehash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.filename)
        .bind(&doc.filepath)
        .bind(doc.filesize)
        .bind(&doc.filehash)
        .bind(&doc.created_at)
        .execute(db.pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::DuplicateHash
            }
            _ => AppError::Database(e),
        })?;

        Ok(())
    }

    /// All live records, newest first
    pub async fn list_all(db: &Database) -> Result<Vec<Document>> {
        let docs = sqlx::query_as("SELECT * FROM documents ORDER BY created_at DESC")
            .fetch_all(db.pool())
            .await?;
        Ok(docs)
    }

    /// Returns false if no record had this id
    pub async fn delete_by_id(db: &Database, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
