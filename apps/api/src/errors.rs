use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::badges::external::ExternalError;
use crate::export::ExportError;
use crate::label::LabelError;
use crate::printer::PrinterError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("External badge service error: {0}")]
    External(#[from] ExternalError),

    #[error("Label error: {0}")]
    Label(#[from] LabelError),

    #[error("Printer error: {0}")]
    Printer(#[from] PrinterError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::External(e) => {
                tracing::error!("External badge service error: {e}");
                (StatusCode::BAD_GATEWAY, "EXTERNAL_ERROR", e.to_string())
            }
            AppError::Label(LabelError::InvalidRequest(msg)) => {
                (StatusCode::BAD_REQUEST, "INVALID_LABEL_REQUEST", msg.clone())
            }
            AppError::Label(e @ LabelError::FontUnavailable) => {
                tracing::error!("Label error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "FONT_UNAVAILABLE", e.to_string())
            }
            AppError::Printer(e) => {
                tracing::error!("Printer error: {e}");
                let (status, code) = match e {
                    PrinterError::NotConfigured => {
                        (StatusCode::SERVICE_UNAVAILABLE, "PRINTER_NOT_CONFIGURED")
                    }
                    PrinterError::UnsupportedModel { .. } | PrinterError::InvalidUri(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "PRINTER_CONFIG_ERROR")
                    }
                    PrinterError::Io(_) | PrinterError::Timeout(_) => {
                        (StatusCode::BAD_GATEWAY, "PRINTER_ERROR")
                    }
                };
                (status, code, e.to_string())
            }
            AppError::Export(e) => {
                tracing::error!("Export error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "EXPORT_ERROR", e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
