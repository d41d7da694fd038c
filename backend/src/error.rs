//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::loader::LoadError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Entity with the given key was not found
    #[error("{0}")]
    NotFound(String),

    /// Request body or query parameters are invalid
    #[error("Validation error: {0}")]
    Validation(String),

    /// CSV file required by the batch load is missing
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Permission denied for the requested operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Document store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Batch load failure
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::FileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::Duplicate { .. }) => StatusCode::BAD_REQUEST,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Store(_) | AppError::Load(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:?}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("Município não encontrado".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("idh".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PermissionDenied("load".into()).status(),
            StatusCode::FORBIDDEN
        );
        let duplicate = AppError::Store(StoreError::Duplicate {
            collection: "escolas",
            message: "UNIQUE constraint failed".into(),
        });
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Store(StoreError::Migration("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let response = AppError::Internal(anyhow::anyhow!("secret path /srv/db")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
