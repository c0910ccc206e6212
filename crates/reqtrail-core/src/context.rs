//! Per-request correlation context.
//!
//! Carries the correlation id, user agent, and client ip for one in-flight
//! request. The audit middleware installs the context as a tokio task-local
//! scope; anything that logs while the request is being handled, including
//! the JSON event encoder, reads it ambiently through the accessors here,
//! without the request object being threaded through every call.
//!
//! The binding is task-scoped, not thread-scoped: when the scope future
//! completes or unwinds, the binding is dropped, so a reused worker thread
//! never carries an id from a previous request.

use std::future::Future;
use std::net::SocketAddr;

use http::header::{HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;
use uuid::Uuid;

/// Preferred correlation header.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
/// Fallback correlation header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Forwarded client address header, preferred over the transport peer.
pub const FORWARDED_FOR_HEADER: &str = "x-original-forwarded-for";

/// Failure while reading a single context field from the request.
///
/// Derivation never fails as a whole: the affected field falls back and the
/// error is handed to the caller for reporting.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("header `{0}` is not valid UTF-8")]
    MalformedHeader(&'static str),
}

/// Correlation data for one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    /// Opaque token tying together every log line of this request.
    pub correlation_id: String,
    /// Verbatim `user-agent` header, absent when the client sent none.
    pub user_agent: Option<String>,
    /// Forwarded-for header value, else the transport peer address.
    pub client_ip: String,
}

tokio::task_local! {
    static ACTIVE: CorrelationContext;
}

impl CorrelationContext {
    /// Build the context from request headers and the transport peer address.
    ///
    /// Field priority follows the wire contract: `x-correlation-id`, else
    /// `x-request-id`, else a freshly generated UUID; `x-original-forwarded-for`,
    /// else the peer address; `user-agent` verbatim. Malformed header values
    /// are returned alongside the context and leave their field at the
    /// fallback value.
    pub fn derive(
        headers: &HeaderMap,
        remote_addr: Option<SocketAddr>,
    ) -> (Self, Vec<ContextError>) {
        let mut errors = Vec::new();

        let correlation_id = non_blank(header_str(headers, CORRELATION_ID_HEADER, &mut errors))
            .or_else(|| non_blank(header_str(headers, REQUEST_ID_HEADER, &mut errors)))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|value| decode_value(value, "user-agent", &mut errors));

        let client_ip = non_blank(header_str(headers, FORWARDED_FOR_HEADER, &mut errors))
            .or_else(|| remote_addr.map(|addr| addr.ip().to_string()))
            .unwrap_or_default();

        (
            Self {
                correlation_id,
                user_agent,
                client_ip,
            },
            errors,
        )
    }

    /// Run `fut` with this context installed as the ambient context.
    ///
    /// The binding is removed when the future finishes, on every exit path
    /// including panics; this is the teardown the reuse invariant depends on.
    pub async fn scope<F>(self, fut: F) -> F::Output
    where
        F: Future,
    {
        ACTIVE.scope(self, fut).await
    }
}

fn header_str(
    headers: &HeaderMap,
    name: &'static str,
    errors: &mut Vec<ContextError>,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| decode_value(value, name, errors))
}

fn decode_value(
    value: &HeaderValue,
    name: &'static str,
    errors: &mut Vec<ContextError>,
) -> Option<String> {
    match value.to_str() {
        Ok(text) => Some(text.to_string()),
        Err(_) => {
            errors.push(ContextError::MalformedHeader(name));
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Snapshot of the ambient context, `None` outside a request scope.
pub fn current() -> Option<CorrelationContext> {
    ACTIVE.try_with(Clone::clone).ok()
}

/// Ambient correlation id, `None` outside a request scope.
pub fn correlation_id() -> Option<String> {
    ACTIVE.try_with(|ctx| ctx.correlation_id.clone()).ok()
}

/// Ambient user agent, `None` outside a scope or when the client sent none.
pub fn user_agent() -> Option<String> {
    ACTIVE.try_with(|ctx| ctx.user_agent.clone()).ok().flatten()
}

/// Ambient client ip, `None` outside a request scope.
pub fn client_ip() -> Option<String> {
    ACTIVE.try_with(|ctx| ctx.client_ip.clone()).ok()
}
