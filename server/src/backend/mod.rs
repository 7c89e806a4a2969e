//! # Backend Module
//!
//! Everything behind the HTTP port of the dues tracker:
//! - **Domain**: dues rules, reconciliation and the services built on them
//! - **Storage**: SQLite repositories and the receipt file store
//! - **IO**: REST handlers and DTO mapping
//!
//! ## Architecture
//!
//! ```text
//! HTTP clients (student portal, admin dashboard)
//!     ↓
//! IO Layer (axum handlers, mappers)
//!     ↓
//! Domain Layer (services, reconciliation)
//!     ↓
//! Storage Layer (SQLite, upload directory)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;

use crate::backend::config::AppConfig;
use crate::backend::domain::{PaymentCardService, PaymentService, StudentService, UploadService};
use crate::backend::storage::{DbConnection, ReceiptStore};

/// Room for the multipart envelope and text fields around the receipt
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub student_service: StudentService,
    pub payment_service: PaymentService,
    pub payment_card_service: PaymentCardService,
}

impl AppState {
    /// Wire the services over an open database
    pub fn new(db: DbConnection, config: &AppConfig) -> Result<Self> {
        let policy = config.dues_policy()?;
        let upload_service = UploadService::new(ReceiptStore::new(&config.upload_root), config.max_upload_bytes);

        Ok(Self {
            student_service: StudentService::new(db.clone()),
            payment_service: PaymentService::new(db.clone(), upload_service, policy),
            payment_card_service: PaymentCardService::new(db, policy),
        })
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let db = DbConnection::new(&config.database_url).await?;

    info!("Preparing upload directory {}", config.upload_root.display());
    tokio::fs::create_dir_all(&config.upload_root)
        .await
        .with_context(|| format!("Failed to create upload directory {}", config.upload_root.display()))?;

    info!("Setting up domain services");
    let state = AppState::new(db, config)?;

    if let Some(csv_path) = &config.students_csv {
        state.student_service.seed_from_csv(csv_path).await?;
    }

    Ok(state)
}

/// Create the Axum router with all routes configured
pub fn create_router(state: AppState, config: &AppConfig) -> Result<Router> {
    let origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid allowed_origin '{}'", config.allowed_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    let body_limit = usize::try_from(config.max_upload_bytes)
        .context("max_upload_bytes does not fit in memory")?
        .saturating_add(FORM_OVERHEAD_BYTES);

    let api_routes = Router::new()
        .nest("/students", io::rest::student_apis::router())
        .nest("/payments", io::rest::payment_apis::router());

    Ok(Router::new()
        .nest("/api", api_routes)
        .nest_service(ReceiptStore::PUBLIC_PREFIX, ServeDir::new(&config.upload_root))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use shared::Gender;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::backend::domain::models::Student;
    use crate::backend::storage::{StudentRepository, StudentStorage};

    const BOUNDARY: &str = "dues-tracker-test-boundary";

    struct TestApp {
        _temp: TempDir,
        router: Router,
        student: Student,
    }

    async fn setup_test() -> TestApp {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            upload_root: temp.path().to_path_buf(),
            ..AppConfig::default()
        };
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let student = StudentRepository::new(db.clone())
            .upsert_student(&Student::new("Ayu Lestari", shared::StudentClass::A1, Gender::Female))
            .await
            .unwrap();
        let state = AppState::new(db, &config).unwrap();
        let router = create_router(state, &config).unwrap();
        TestApp {
            _temp: temp,
            router,
            student,
        }
    }

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, Vec<u8>)>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, file_name, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(&bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn submit_request(student_id: &str, start: &str, end: &str, file: Option<(&str, &str, Vec<u8>)>) -> Request<Body> {
        let body = multipart_body(
            &[("student_id", student_id), ("start_month", start), ("end_month", end)],
            file,
        );
        Request::builder()
            .method("POST")
            .uri("/api/payments")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn png() -> Option<(&'static str, &'static str, Vec<u8>)> {
        Some(("transfer.png", "image/png", vec![7u8; 4096]))
    }

    fn patch_request(payment_id: &str, json: Value) -> Request<Body> {
        Request::builder()
            .method("PATCH")
            .uri(format!("/api/payments/{}", payment_id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_list_and_get_students() {
        let app = setup_test().await;

        let (status, json) = send(&app, get_request("/api/students?class=A1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["students"][0]["name"], "Ayu Lestari");
        assert_eq!(json["data"]["students"][0]["gender"], "FEMALE");

        let (status, json) = send(&app, get_request("/api/students?class=Q9")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, _) = send(&app, get_request(&format!("/api/students/{}", app.student.id))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, get_request("/api/students/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_submit_review_and_card_flow() {
        let app = setup_test().await;

        let (status, json) = send(&app, submit_request(&app.student.id, "2025-07", "2025-09", png())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["status"], "PENDING");
        assert_eq!(json["data"]["amount"], 90000);
        assert_eq!(json["data"]["period"], "2025-07 - 2025-09");
        assert_eq!(json["data"]["student"]["class"], "A1");
        let payment_id = json["data"]["id"].as_str().unwrap().to_string();

        // Same period while the first is pending
        let (status, _) = send(&app, submit_request(&app.student.id, "2025-07", "2025-09", png())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(&app, patch_request(&payment_id, serde_json::json!({ "status": "PAID" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, json) = send(
            &app,
            patch_request(&payment_id, serde_json::json!({ "status": "APPROVED", "approved_by": "Treasurer" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "APPROVED");
        assert_eq!(json["data"]["approved_by"], "Treasurer");

        let (status, json) = send(&app, get_request(&format!("/api/students/{}/payment-card", app.student.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["paid_count"], 3);
        assert_eq!(json["data"]["progress_percent"], 25);
        assert_eq!(json["data"]["total_paid_amount"], 90000);
        assert_eq!(json["data"]["paid_months"][0], "2025-07");
        assert_eq!(json["data"]["months"][0]["label"], "July 2025");
        assert_eq!(json["data"]["months"][0]["paid"], true);
        assert_eq!(json["data"]["months"][3]["paid"], false);

        let (status, json) = send(&app, get_request(&format!("/api/students/{}/months", app.student.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["months"][2]["available"], false);
        assert_eq!(json["data"]["months"][3]["available"], true);

        // Overlap with an approved month
        let (status, _) = send(&app, submit_request(&app.student.id, "2025-09", "2025-10", png())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(&app, get_request("/api/payments/approved")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["students"][0]["paid_months"].as_array().unwrap().len(), 3);

        let (status, json) = send(&app, get_request("/api/payments/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["approved"], 1);
        assert_eq!(json["data"]["total"], 1);
    }

    #[tokio::test]
    async fn test_resubmission_after_rejection() {
        let app = setup_test().await;

        let (_, json) = send(&app, submit_request(&app.student.id, "2025-08", "2025-08", png())).await;
        let payment_id = json["data"]["id"].as_str().unwrap().to_string();

        let (status, json) = send(
            &app,
            patch_request(&payment_id, serde_json::json!({ "status": "REJECTED", "rejection_reason": "Blurry" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["rejection_reason"], "Blurry");

        let (status, _) = send(&app, submit_request(&app.student.id, "2025-08", "2025-08", png())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(&app, get_request("/api/payments?status=REJECTED")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["pagination"]["total"], 1);
        assert_eq!(json["data"]["payments"][0]["id"], payment_id.as_str());
    }

    #[tokio::test]
    async fn test_submission_validation_errors() {
        let app = setup_test().await;

        let (status, _) = send(&app, submit_request(&app.student.id, "2025-07", "2025-07", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            submit_request(&app.student.id, "2025-07", "2025-07", Some(("r.pdf", "application/pdf", vec![1u8; 10]))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, submit_request(&app.student.id, "2025-10", "2025-07", png())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, submit_request("ghost", "2025-07", "2025-07", png())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(
            &app,
            submit_request(
                &app.student.id,
                "2025-07",
                "2025-07",
                Some(("big.png", "image/png", vec![0u8; 5 * 1024 * 1024 + 10])),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("5MB"));
    }

    #[tokio::test]
    async fn test_body_over_transport_limit_reports_size() {
        let app = setup_test().await;

        let (status, json) = send(
            &app,
            submit_request(
                &app.student.id,
                "2025-07",
                "2025-07",
                Some(("huge.png", "image/png", vec![0u8; 6 * 1024 * 1024])),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("5MB"));

        let (_, json) = send(&app, get_request("/api/payments")).await;
        assert_eq!(json["data"]["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn test_extractor_rejections_use_envelope() {
        let app = setup_test().await;

        let (_, json) = send(&app, submit_request(&app.student.id, "2025-07", "2025-07", png())).await;
        let payment_id = json["data"]["id"].as_str().unwrap().to_string();

        let (status, json) = send(&app, patch_request(&payment_id, serde_json::json!({ "approved_by": "admin" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("status"));

        let (status, json) = send(&app, get_request("/api/payments?page=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());

        let (status, json) = send(&app, get_request("/api/payments?approved_only=maybe")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, json) = send(&app, get_request("/api/students?class=A1&class=B2")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let request = Request::builder()
            .method("POST")
            .uri("/api/payments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_uploaded_receipt_is_served() {
        let app = setup_test().await;

        let (_, json) = send(&app, submit_request(&app.student.id, "2025-07", "2025-07", png())).await;
        let payment_id = json["data"]["id"].as_str().unwrap();

        let (status, json) = send(&app, get_request(&format!("/api/payments/{}", payment_id))).await;
        assert_eq!(status, StatusCode::OK);
        let file_path = json["data"]["file_path"].as_str().unwrap().to_string();
        assert!(file_path.starts_with("/uploads/payments/"));
        assert!(file_path.contains(&app.student.id));

        let response = app.router.clone().oneshot(get_request(&file_path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.len(), 4096);
    }

    #[tokio::test]
    async fn test_unknown_payment() {
        let app = setup_test().await;
        let (status, json) = send(&app, get_request("/api/payments/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);

        let (status, _) = send(&app, patch_request("nope", serde_json::json!({ "status": "APPROVED" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
