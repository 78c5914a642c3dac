use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;

use crate::error::{AppError, Result};
use crate::models::{Document, DocumentListResponse, DocumentResponse, MessageResponse};
use crate::services::DocumentService;
use crate::AppState;

/// Upload a document
/// POST /documents/upload
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::InvalidInput(format!("Failed to process multipart: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::InvalidInput("No file name provided".to_string()))?;
        let content_type = field.content_type().map(|s| s.to_string());

        // Hand the field to the service as a plain byte stream
        let stream = futures::stream::try_unfold(field, |mut field| async move {
            let chunk = field.chunk().await.map_err(|e| {
                AppError::InvalidInput(format!("Failed to read file chunk: {}", e))
            })?;
            Ok(chunk.map(|c| (c, field)))
        })
        .boxed();

        let doc = DocumentService::ingest(
            &state.db,
            state.storage.as_ref(),
            &state.config.upload,
            filename,
            content_type.as_deref(),
            stream,
        )
        .await?;

        return Ok((StatusCode::CREATED, Json(DocumentResponse::from(doc))));
    }

    Err(AppError::InvalidInput("No file provided".to_string()))
}

/// List all documents, newest first
/// GET /documents
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>> {
    let documents = DocumentService::list_documents(&state.db).await?;

    Ok(Json(DocumentListResponse {
        documents: documents.into_iter().map(DocumentResponse::from).collect(),
    }))
}

/// Download a document as an attachment with its original filename
/// GET /documents/:id
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let (doc, data) =
        DocumentService::get_for_download(&state.db, state.storage.as_ref(), &id).await?;

    let disposition = content_disposition("attachment", &doc);
    build_binary_response(data, disposition)
}

/// Render a document inline
/// GET /documents/:id/view
pub async fn view_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let (doc, data) =
        DocumentService::get_for_download(&state.db, state.storage.as_ref(), &id).await?;

    let disposition = content_disposition("inline", &doc);
    build_binary_response(data, disposition)
}

/// Delete a document
/// DELETE /documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    DocumentService::delete_document(&state.db, state.storage.as_ref(), &id).await?;
    Ok(Json(MessageResponse::new("Document deleted successfully")))
}

fn content_disposition(kind: &str, doc: &Document) -> String {
    let fallback_name = doc.filename.replace(['"', '\\'], "_");
    let encoded_name = urlencoding::encode(&doc.filename);
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind, fallback_name, encoded_name
    )
}

fn build_binary_response(data: bytes::Bytes, disposition: String) -> Result<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
