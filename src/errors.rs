use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::BookingStatus;
use crate::workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("directory unavailable")]
    DirectoryUnavailable(#[source] anyhow::Error),

    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("booking {id} is already {status}")]
    BookingNotPending { id: Uuid, status: BookingStatus },

    #[error("booking {booking_id} approved but classroom {room} update failed")]
    ClassroomUpdate {
        booking_id: Uuid,
        room: String,
        repair_queued: bool,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::DirectoryUnavailable(source) => AppError::DirectoryUnavailable(source),
            WorkflowError::BookingNotFound(id) => AppError::BookingNotFound(id),
            WorkflowError::ClassroomUpdate {
                booking_id,
                room,
                repair_queued,
                ..
            } => AppError::ClassroomUpdate {
                booking_id,
                room,
                repair_queued,
            },
        }
    }
}

// Extractor rejections surface as 400 invalid_request with the JSON error body.

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::DirectoryUnavailable(e) => {
                tracing::error!("Directory store error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "unavailable_error",
                    "directory_unavailable",
                    "directory store unavailable".to_string(),
                )
            }
            AppError::BookingNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "booking_not_found",
                format!("booking {} not found", id),
            ),
            AppError::BookingNotPending { id, status } => (
                StatusCode::CONFLICT,
                "conflict_error",
                "booking_not_pending",
                format!("booking {} is already {}", id, status),
            ),
            AppError::ClassroomUpdate {
                booking_id,
                room,
                repair_queued,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_update_error",
                "classroom_update_failed",
                format!(
                    "booking {} is Approved but classroom {} was not marked Occupied ({})",
                    booking_id,
                    room,
                    if *repair_queued {
                        "repair queued"
                    } else {
                        "repair not queued"
                    }
                ),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "not_found",
                format!("{} not found", what),
            ),
            AppError::InvalidRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request",
                reason.clone(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
