use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::ExistingDocument;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An upload whose content hash is already claimed by a live record.
    /// Carries the identity of that record; a normal outcome, not a failure.
    #[error("This file has already been uploaded")]
    Duplicate(ExistingDocument),

    /// Unique-index violation on insert where the winning record could not
    /// be read back
    #[error("This file has already been uploaded")]
    DuplicateHash,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body for every non-2xx response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(rename = "existingDocument", skip_serializing_if = "Option::is_none")]
    pub existing_document: Option<ExistingDocument>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            details: None,
            existing_document: None,
        }
    }

    fn with_details(error: &str, details: String) -> Self {
        Self {
            error: error.to_string(),
            details: Some(details),
            existing_document: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Failed to access document store", e.to_string()),
                )
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(&msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(&msg)),
            AppError::Duplicate(existing) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "This file has already been uploaded".to_string(),
                    details: None,
                    existing_document: Some(existing),
                },
            ),
            AppError::DuplicateHash => (
                StatusCode::CONFLICT,
                ErrorResponse::new("This file has already been uploaded"),
            ),
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Storage failure", msg),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("IO error", e.to_string()),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Internal server error", msg),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
