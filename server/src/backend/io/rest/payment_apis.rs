//! # REST API for Payments
//!
//! Submission (multipart with the receipt image), admin review, listing,
//! the approved-months overview and dashboard totals.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use shared::{ApiResponse, UpdatePaymentStatusRequest};
use tracing::{error, info, warn};

use crate::backend::domain::commands::payments::{PaymentListQuery, ReviewPaymentCommand, SubmitPaymentCommand};
use crate::backend::domain::{PaymentService, UploadedFile};
use crate::backend::io::rest::errors::ApiError;
use crate::backend::io::rest::mappers::PaymentMapper;
use crate::backend::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListParams {
    pub student_id: Option<String>,
    pub status: Option<String>,
    pub class: Option<String>,
    pub search: Option<String>,
    pub approved_only: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Create a router for payment related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments).post(submit_payment))
        .route("/approved", get(list_approved_months))
        .route("/stats", get(get_payment_stats))
        .route("/:id", get(get_payment).patch(update_payment_status))
}

/// A body over the transport limit surfaces as the receipt size error
fn multipart_error(service: &PaymentService, e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Multipart body exceeded the size limit: {}", e);
        return ApiError::from(service.oversized_receipt());
    }
    warn!("Malformed multipart body: {}", e);
    ApiError::new(e.status(), e.body_text())
}

/// Read the multipart form into a submission command.
///
/// Unknown fields are ignored; missing ones are left `None` for the
/// service to report.
async fn read_submission(
    service: &PaymentService,
    multipart: &mut Multipart,
) -> Result<SubmitPaymentCommand, ApiError> {
    let mut command = SubmitPaymentCommand::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(service, e)),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(service, e))?;
                command.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "student_id" | "start_month" | "end_month" => {
                let value = field.text().await.map_err(|e| multipart_error(service, e))?;
                match name.as_str() {
                    "student_id" => command.student_id = Some(value),
                    "start_month" => command.start_month = Some(value),
                    _ => command.end_month = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok(command)
}

/// Submit a payment with its receipt image
pub async fn submit_payment(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    info!("POST /api/payments");

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!("Rejected payment submission: {}", rejection);
            return ApiError::bad_request(rejection.body_text()).into_response();
        }
    };

    let command = match read_submission(&state.payment_service, &mut multipart).await {
        Ok(command) => command,
        Err(e) => return e.into_response(),
    };

    match state.payment_service.submit_payment(command).await {
        Ok(result) => {
            let response = PaymentMapper::to_submit_response(result);
            (StatusCode::CREATED, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            error!("Failed to submit payment: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// List payments with filters and pagination
pub async fn list_payments(
    State(state): State<AppState>,
    params: Result<Query<PaymentListParams>, QueryRejection>,
) -> impl IntoResponse {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => {
            warn!("Invalid payment list query: {}", rejection);
            return ApiError::bad_request(rejection.body_text()).into_response();
        }
    };
    info!("GET /api/payments - {:?}", params);

    let query = PaymentListQuery {
        student_id: params.student_id,
        status: params.status,
        class: params.class,
        search: params.search,
        approved_only: params.approved_only,
        page: params.page,
        limit: params.limit,
    };

    match state.payment_service.list_payments(query).await {
        Ok(result) => {
            let response = PaymentMapper::to_list_response(result);
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            error!("Failed to list payments: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

pub async fn get_payment(State(state): State<AppState>, Path(payment_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/payments/{}", payment_id);

    match state.payment_service.get_payment(&payment_id).await {
        Ok(record) => (StatusCode::OK, Json(ApiResponse::ok(PaymentMapper::to_dto(record)))).into_response(),
        Err(e) => {
            error!("Failed to get payment {}: {}", payment_id, e);
            ApiError::from(e).into_response()
        }
    }
}

/// Approve or reject a payment
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    request: Result<Json<UpdatePaymentStatusRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => {
            warn!("Invalid review body for payment {}: {}", payment_id, rejection);
            return ApiError::bad_request(rejection.body_text()).into_response();
        }
    };
    info!("PATCH /api/payments/{} - status: {}", payment_id, request.status);

    let command = ReviewPaymentCommand {
        payment_id: payment_id.clone(),
        status: request.status,
        rejection_reason: request.rejection_reason,
        approved_by: request.approved_by,
    };

    match state.payment_service.review_payment(command).await {
        Ok(record) => (StatusCode::OK, Json(ApiResponse::ok(PaymentMapper::to_dto(record)))).into_response(),
        Err(e) => {
            error!("Failed to update payment {}: {}", payment_id, e);
            ApiError::from(e).into_response()
        }
    }
}

/// Every student with approved payments and their paid months
pub async fn list_approved_months(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/payments/approved");

    match state.payment_card_service.list_approved_months().await {
        Ok(students) => {
            let response = PaymentMapper::to_approved_response(students);
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            error!("Failed to list approved payments: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Counts per status and summed amount
pub async fn get_payment_stats(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/payments/stats");

    match state.payment_service.stats().await {
        Ok(totals) => (StatusCode::OK, Json(ApiResponse::ok(PaymentMapper::to_stats(totals)))).into_response(),
        Err(e) => {
            error!("Failed to compute payment stats: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
