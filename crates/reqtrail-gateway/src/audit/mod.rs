//! Request/response audit interceptors.
//!
//! Wraps handler invocation: installs the correlation context, emits the
//! request line, runs the handler, classifies the result, emits the response
//! line. Logging is strictly best-effort: a failure inside a logging
//! routine is reported at error level and never changes what the client
//! receives. Handler outcomes (including panics) propagate unchanged; the
//! context scope unwinds on every exit path.

mod lines;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use http_body_util::BodyExt;
use tracing::{debug, error};

use reqtrail_core::{config::AuditConfig, context::CorrelationContext, exclude::ExcludedPaths};

pub(crate) use lines::{request_line, response_line};

/// Shared interceptor state. Both emission points consult the same parsed
/// exclusion policy.
#[derive(Clone)]
pub struct AuditPolicy {
    excluded: Arc<ExcludedPaths>,
}

impl AuditPolicy {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            excluded: Arc::new(config.excluded_paths.clone()),
        }
    }

    /// Policy built from the process environment.
    pub fn from_env() -> Self {
        Self::new(&AuditConfig::from_env())
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.excluded.is_excluded(path)
    }
}

/// Attach the normal-path interceptor to a router.
pub fn with_audit(router: Router, policy: AuditPolicy) -> Router {
    router.layer(middleware::from_fn_with_state(policy, audit_middleware))
}

/// Attach the error-path interceptor to the router that owns the
/// centralized error handler.
pub fn with_error_audit(router: Router, policy: AuditPolicy) -> Router {
    router.layer(middleware::from_fn_with_state(
        policy,
        error_audit_middleware,
    ))
}

/// Normal-path interceptor: request line, handler, response line.
pub async fn audit_middleware(
    State(policy): State<AuditPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let remote = peer_addr(&request);
    let (ctx, context_errors) = CorrelationContext::derive(request.headers(), remote);

    ctx.scope(async move {
        report_context_errors(&context_errors);

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let query = request.uri().query().map(str::to_string);
        let excluded = policy.is_excluded(&path);

        // Buffer the body so it can be logged and then replayed to the
        // handler. Excluded paths are left untouched end to end.
        let request = if excluded {
            request
        } else {
            let (parts, body) = request.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) => {
                    error!(error = %err, "Failed to read request body");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };

            match request_line(&method, &path, &parts.headers, query.as_deref(), &bytes) {
                Ok(line) => debug!("{line}"),
                Err(err) => error!(error = %err, "Failed-logRequest"),
            }

            Request::from_parts(parts, Body::from(bytes))
        };

        let response = next.run(request).await;

        if excluded {
            return response;
        }
        let elapsed_ms = started.elapsed().as_millis() as u64;
        finish_response(response, &method, &path, elapsed_ms, StatusCode::OK).await
    })
    .await
}

/// Error-path interceptor: wraps the centralized error handler. No request
/// line is emitted and no start timestamp exists, so elapsed time is
/// reported as 0; a response without explicit content-type information is
/// logged at 500 since on this path something has already failed.
pub async fn error_audit_middleware(
    State(policy): State<AuditPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let remote = peer_addr(&request);
    let (ctx, context_errors) = CorrelationContext::derive(request.headers(), remote);

    ctx.scope(async move {
        report_context_errors(&context_errors);

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let excluded = policy.is_excluded(&path);

        let response = next.run(request).await;

        if excluded {
            return response;
        }
        finish_response(response, &method, &path, 0, StatusCode::INTERNAL_SERVER_ERROR).await
    })
    .await
}

fn peer_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0)
}

fn report_context_errors(errors: &[reqtrail_core::ContextError]) {
    for err in errors {
        error!(error = %err, "Failed-RequestInterceptor");
    }
}

/// How a response is logged, decided from its explicit content type.
enum ResponseKind {
    /// JSON media type: the body itself is logged.
    Json,
    /// Any other explicit media type: a placeholder names the type.
    Other(String),
    /// No content-type header: raw body, status defaults per interception
    /// point.
    Untyped,
}

fn classify(headers: &HeaderMap) -> ResponseKind {
    match headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) {
        Some(raw) => {
            let essence = raw.split(';').next().unwrap_or(raw).trim();
            if essence.eq_ignore_ascii_case("application/json") {
                ResponseKind::Json
            } else {
                ResponseKind::Other(essence.to_string())
            }
        }
        None => ResponseKind::Untyped,
    }
}

/// Classify the response and emit the response line. Bodies are buffered
/// only when they will be logged; other responses stream through untouched.
async fn finish_response(
    response: Response,
    method: &Method,
    path: &str,
    elapsed_ms: u64,
    default_status: StatusCode,
) -> Response {
    match classify(response.headers()) {
        ResponseKind::Other(content_type) => {
            let status = response.status().as_u16();
            let line = response_line(
                method,
                path,
                elapsed_ms,
                status,
                &format!("{content_type} content"),
            );
            debug!("{line}");
            response
        }
        kind => {
            let (parts, body) = response.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) => {
                    error!(error = %err, "Failed to read response body");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };

            let status = match kind {
                ResponseKind::Json => parts.status.as_u16(),
                _ => default_status.as_u16(),
            };
            let rendered = reqtrail_core::serialize::render_bytes(&bytes);
            let line = response_line(method, path, elapsed_ms, status, &rendered);
            debug!("{line}");

            Response::from_parts(parts, Body::from(bytes))
        }
    }
}
