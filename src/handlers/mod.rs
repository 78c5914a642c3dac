use axum::{http::StatusCode, Json};

pub mod document;

use crate::error::ErrorResponse;
use crate::models::MessageResponse;

/// Liveness probe
/// GET /health
pub async fn health_check() -> Json<MessageResponse> {
    Json(MessageResponse::new("Backend is running"))
}

/// Fallback for unmatched routes
pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Route not found")),
    )
}
