//! Excluded-path behavior.

use pretty_assertions::assert_eq;
use tower::ServiceExt;

use reqtrail_core::AuditConfig;
use reqtrail_gateway::AuditPolicy;
use tests::{demo_router, get_request, subscriber, LogCapture};

fn health_excluded() -> AuditPolicy {
    AuditPolicy::new(&AuditConfig::with_excluded_paths("/health"))
}

#[tokio::test]
async fn excluded_prefix_suppresses_request_and_response_lines() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    let response = demo_router(health_excluded())
        .oneshot(get_request("/health/live"))
        .await
        .expect("infallible service");
    assert_eq!(response.status(), 200);

    assert!(capture.audit_lines("REQUEST").is_empty());
    assert!(capture.audit_lines("RESPONSE").is_empty());
}

#[tokio::test]
async fn non_matching_path_still_produces_both_lines_in_the_same_run() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    demo_router(health_excluded())
        .oneshot(get_request("/health/live"))
        .await
        .expect("infallible service");
    demo_router(health_excluded())
        .oneshot(get_request("/api/items"))
        .await
        .expect("infallible service");

    let request_lines = capture.audit_lines("REQUEST");
    let response_lines = capture.audit_lines("RESPONSE");
    assert_eq!(request_lines.len(), 1);
    assert_eq!(response_lines.len(), 1);
    assert!(request_lines[0].contains("[/api/items]"));
    assert!(response_lines[0].contains("[/api/items]"));
}

#[tokio::test]
async fn exclusion_also_applies_to_the_error_interceptor() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    let policy = AuditPolicy::new(&AuditConfig::with_excluded_paths("/errors"));
    tests::error_router(policy)
        .oneshot(get_request("/errors/json"))
        .await
        .expect("infallible service");

    assert!(capture.audit_lines("RESPONSE").is_empty());
}
