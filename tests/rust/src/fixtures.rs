//! Demo routers driven by the integration tests.
//!
//! Handlers cover each response shape the interceptor classifies: JSON,
//! explicit non-JSON content type, and no content type at all.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::debug;

use reqtrail_gateway::{with_audit, with_error_audit, AuditPolicy};

/// Router instrumented with the normal-path interceptor.
pub fn demo_router(policy: AuditPolicy) -> Router {
    let router = Router::new()
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/report", get(csv_report))
        .route("/api/raw", get(raw_result))
        .route("/api/fail", get(failing))
        .route("/health/live", get(liveness));
    with_audit(router, policy)
}

/// Router standing in for a centralized error handler, instrumented with
/// the error-path interceptor.
pub fn error_router(policy: AuditPolicy) -> Router {
    let router = Router::new()
        .route("/errors/json", get(error_json))
        .route("/errors/raw", get(error_raw));
    with_error_audit(router, policy)
}

async fn list_items() -> Json<Value> {
    debug!("listing items");
    Json(json!([{"id": 1, "name": "alpha"}]))
}

async fn create_item(body: String) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "accepted": body.len() })))
}

async fn csv_report() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/csv")], "id,name\n1,alpha\n")
}

async fn raw_result() -> Response {
    // Deliberately no content-type header.
    Response::builder()
        .status(StatusCode::OK)
        .body(Body::from("plain result"))
        .expect("static response")
}

async fn failing() -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"})))
}

async fn liveness() -> Json<Value> {
    Json(json!({"status": "up"}))
}

async fn error_json() -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_GATEWAY, Json(json!({"error": "upstream unreachable"})))
}

async fn error_raw() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .body(Body::from("failure detail"))
        .expect("static response")
}

/// GET request with an empty body.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request construction")
}

/// GET request carrying extra headers.
pub fn request_with_headers(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("request construction")
}
