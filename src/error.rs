use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{announce::AnnounceError, engine::EngineError},
};

/// Shown to the host when storing an upload batch fails.
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Try again.";

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// The game moved on but the saved copy could not be updated.
    #[error("game updated but not saved; retry to save it")]
    Unsynced(#[source] StorageError),
    /// Storing uploaded clips failed part way.
    #[error("{UPLOAD_FAILED_MESSAGE}")]
    UploadFailed(#[source] StorageError),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// No clip exists for the requested number.
    #[error("{0}")]
    ClipMissing(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The clip could not be started.
    #[error("playback failed: {0}")]
    Playback(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unsynced(source) => ServiceError::Unsynced(source),
        }
    }
}

impl From<AnnounceError> for ServiceError {
    fn from(err: AnnounceError) -> Self {
        match err {
            AnnounceError::NotOpen | AnnounceError::Busy | AnnounceError::Superseded => {
                ServiceError::InvalidState(err.to_string())
            }
            AnnounceError::ClipMissing { .. } => ServiceError::ClipMissing(err.to_string()),
            AnnounceError::UnknownLease(_) => ServiceError::NotFound(err.to_string()),
            AnnounceError::Player(message) => ServiceError::Playback(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or not saving.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            err @ (ServiceError::Unsynced(_) | ServiceError::UploadFailed(_)) => {
                AppError::ServiceUnavailable(err.to_string())
            }
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::ClipMissing(message) | ServiceError::NotFound(message) => {
                AppError::NotFound(message)
            }
            ServiceError::Playback(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
