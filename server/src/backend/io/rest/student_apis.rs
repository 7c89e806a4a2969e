//! # REST API for the Student Roster
//!
//! Roster lookups plus the per-student payment card and month picker.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use shared::ApiResponse;
use tracing::{error, info, warn};

use crate::backend::domain::commands::students::StudentListQuery;
use crate::backend::io::rest::errors::ApiError;
use crate::backend::io::rest::mappers::{PaymentCardMapper, StudentMapper};
use crate::backend::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StudentListParams {
    pub class: Option<String>,
}

/// Create a router for student related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students))
        .route("/:id", get(get_student))
        .route("/:id/payment-card", get(get_payment_card))
        .route("/:id/months", get(get_month_picker))
}

/// List students, optionally filtered by class
pub async fn list_students(
    State(state): State<AppState>,
    params: Result<Query<StudentListParams>, QueryRejection>,
) -> impl IntoResponse {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => {
            warn!("Invalid student list query: {}", rejection);
            return ApiError::bad_request(rejection.body_text()).into_response();
        }
    };
    info!("GET /api/students - class: {:?}", params.class);

    let query = StudentListQuery { class: params.class };
    match state.student_service.list_students(query).await {
        Ok(students) => {
            let response = StudentMapper::to_list_response(students);
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            error!("Failed to list students: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

pub async fn get_student(State(state): State<AppState>, Path(student_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/students/{}", student_id);

    match state.student_service.get_student(&student_id).await {
        Ok(student) => (StatusCode::OK, Json(ApiResponse::ok(StudentMapper::to_dto(student)))).into_response(),
        Err(e) => {
            error!("Failed to get student {}: {}", student_id, e);
            ApiError::from(e).into_response()
        }
    }
}

/// Paid months and progress over the academic year
pub async fn get_payment_card(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/students/{}/payment-card", student_id);

    match state.payment_card_service.get_payment_card(&student_id).await {
        Ok(view) => {
            let response = PaymentCardMapper::to_payment_card(view);
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            error!("Failed to build payment card for {}: {}", student_id, e);
            ApiError::from(e).into_response()
        }
    }
}

/// Months the student can still select when submitting a payment
pub async fn get_month_picker(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/students/{}/months", student_id);

    match state.payment_card_service.get_month_picker(&student_id).await {
        Ok(view) => {
            let response = PaymentCardMapper::to_month_picker(view);
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            error!("Failed to build month picker for {}: {}", student_id, e);
            ApiError::from(e).into_response()
        }
    }
}
