use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::EmailError;
use crate::services::bulk_import::ImportError;
use crate::services::template_storage::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Event not found")]
    EventNotFound,

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("Not found")]
    NotFound,

    #[error("This email is not registered for this event.")]
    EmailNotRegistered,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("A participant with this email already exists for this event.")]
    DuplicateParticipant,

    #[error("Incorrect CAPTCHA answer. Please try again.")]
    CaptchaFailed,

    #[error("Invalid or expired link")]
    InvalidSignature,

    /// Nothing to render for this participant
    #[error("{0}")]
    CertificateUnavailable(&'static str),

    #[error("Could not generate certificate.")]
    CertificateFailed,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub const TEMPLATE_NOT_FOUND: &str = "Certificate template not found.";
pub const TEMPLATE_NOT_CONFIGURED: &str = "Certificate template not properly configured.";
pub const CERTIFICATE_FILE_NOT_FOUND: &str = "Certificate file not found.";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::EventNotFound
            | ApiError::ParticipantNotFound
            | ApiError::NotFound
            | ApiError::EmailNotRegistered
            | ApiError::CertificateUnavailable(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::InvalidSignature => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_)
            | ApiError::CaptchaFailed
            | ApiError::Import(_)
            | ApiError::Email(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateParticipant => StatusCode::CONFLICT,
            ApiError::Storage(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) | ApiError::CertificateFailed | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            ApiError::Storage(e) if !e.is_client_error() => {
                tracing::error!(error = %e, "Storage failure");
                "Internal storage error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "Internal error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "status": status.as_u16(),
            "error": message,
        }));

        (status, body).into_response()
    }
}
