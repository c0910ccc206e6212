//! Error-path interceptor behavior.

use pretty_assertions::assert_eq;
use tower::ServiceExt;

use reqtrail_core::AuditConfig;
use reqtrail_gateway::AuditPolicy;
use tests::{error_router, get_request, request_with_headers, subscriber, LogCapture};

fn open_policy() -> AuditPolicy {
    AuditPolicy::new(&AuditConfig::default())
}

#[tokio::test]
async fn no_request_line_and_zero_elapsed() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    error_router(open_policy())
        .oneshot(get_request("/errors/json"))
        .await
        .expect("infallible service");

    assert!(capture.audit_lines("REQUEST").is_empty());
    let line = capture.audit_lines("RESPONSE")[0].clone();
    assert!(line.contains("\tELAPSED_TIME\t : 0 ms"), "line: {line}");
    assert!(
        line.contains("\tRESPONSE_BODY (502)\t : {\"error\":\"upstream unreachable\"}"),
        "line: {line}"
    );
}

#[tokio::test]
async fn untyped_error_result_is_logged_at_500() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    let response = error_router(open_policy())
        .oneshot(get_request("/errors/raw"))
        .await
        .expect("infallible service");
    // The client outcome is untouched; only the logged status defaults.
    assert_eq!(response.status(), 200);

    let line = capture.audit_lines("RESPONSE")[0].clone();
    assert!(
        line.contains("\tRESPONSE_BODY (500)\t : failure detail"),
        "line: {line}"
    );
}

#[tokio::test]
async fn error_interceptor_propagates_the_correlation_id() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    error_router(open_policy())
        .oneshot(request_with_headers(
            "/errors/json",
            &[("x-correlation-id", "err-7")],
        ))
        .await
        .expect("infallible service");

    for record in capture.records() {
        assert_eq!(record["logId"], "err-7", "record: {record}");
    }
    assert!(reqtrail_core::context::current().is_none());
}
