//! Translation of domain errors into HTTP responses.
//!
//! Every failure goes out in the `ApiResponse` envelope with
//! `success: false`. Client mistakes carry the domain message; server-side
//! failures are logged in full and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::ApiResponse;
use tracing::error;

use crate::backend::domain::{PaymentError, StudentError, UploadError};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload receipt";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: &str, cause: &dyn std::fmt::Display) -> Self {
        error!("{}: {}", message, cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match &err {
            PaymentError::Validation(_) => Self::bad_request(err.to_string()),
            PaymentError::StudentNotFound(_) | PaymentError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, err.to_string())
            }
            PaymentError::DuplicatePeriod(_) | PaymentError::AlreadyPaid(_) => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            PaymentError::Upload(upload) => Self::from_upload(upload),
            PaymentError::Storage(e) => Self::internal(INTERNAL_ERROR_MESSAGE, e),
        }
    }
}

impl From<StudentError> for ApiError {
    fn from(err: StudentError) -> Self {
        match &err {
            StudentError::InvalidClass(_) => Self::bad_request(err.to_string()),
            StudentError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            StudentError::Storage(e) => Self::internal(INTERNAL_ERROR_MESSAGE, e),
        }
    }
}

impl ApiError {
    fn from_upload(err: &UploadError) -> Self {
        if err.is_validation() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(UPLOAD_FAILED_MESSAGE, err)
        }
    }
}
