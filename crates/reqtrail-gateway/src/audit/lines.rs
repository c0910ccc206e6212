//! Audit line construction.
//!
//! Builds the tab-separated `REQUEST`/`RESPONSE` lines. The header summary
//! is read from the ambient correlation context, not from the raw request,
//! so it reflects exactly what the rest of the log output will carry.

use axum::http::{HeaderMap, Method};
use serde_json::Value;
use tracing::trace;

use reqtrail_core::{context, serialize};

/// Build the request audit line.
///
/// Sections after the headers are optional: an empty parameter map or body
/// contributes nothing, and `END-REQUEST` follows the last section directly.
pub(crate) fn request_line(
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> Result<String, serde_json::Error> {
    let header_json = header_summary(headers)?;
    let params = parameter_map(query);
    let body = serialize::render_bytes(body);

    let mut line = String::from("REQUEST");
    line.push_str(&format!("\t[{method}] - [{path}]"));
    line.push_str(&format!("\tHEADERS\t : {header_json}"));
    if !params.is_empty() {
        line.push_str(&format!("\tPARAMETER_MAP\t : {params}"));
    }
    if !body.is_empty() {
        line.push_str(&format!("\tREQUEST_BODY\t : {body}"));
    }
    line.push_str("END-REQUEST");
    Ok(line)
}

/// Build the response audit line. The body section is optional; the trailing
/// `END-RESPONSE` is always tab-separated.
pub(crate) fn response_line(
    method: &Method,
    path: &str,
    elapsed_ms: u64,
    status: u16,
    body: &str,
) -> String {
    let mut line = String::from("RESPONSE");
    line.push_str(&format!("\t[{method}] - [{path}]"));
    line.push_str(&format!("\tELAPSED_TIME\t : {elapsed_ms} ms"));
    line.push_str(&format!("\tRESPONSE_BODY ({status})"));
    if !body.is_empty() {
        line.push_str(&format!("\t : {body}"));
    }
    line.push_str("\tEND-RESPONSE");
    line
}

/// Summary JSON of the headers of interest, taken from the ambient context.
/// An absent user agent is serialized as an explicit `null`.
fn header_summary(headers: &HeaderMap) -> Result<String, serde_json::Error> {
    let mut all = serde_json::Map::new();
    for (name, value) in headers {
        all.insert(
            name.as_str().to_string(),
            Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        );
    }
    trace!("All Headers: {}", serde_json::to_string(&all)?);

    let mut summary = serde_json::Map::new();
    summary.insert(
        "user-agent".to_string(),
        context::user_agent().map(Value::String).unwrap_or(Value::Null),
    );
    summary.insert(
        "x-correlation-id".to_string(),
        context::correlation_id()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    summary.insert(
        "client-ip".to_string(),
        context::client_ip().map(Value::String).unwrap_or(Value::Null),
    );
    serde_json::to_string(&summary)
}

/// Rebuild the query string as `key=value` pairs joined with `&`.
///
/// Values of a repeated key stay grouped in first-occurrence order; a key
/// with no `=value` part renders literally as `key=null`.
pub(crate) fn parameter_map(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };

    let mut groups: Vec<(String, Vec<Option<String>>)> = Vec::new();
    for token in query.split('&').filter(|token| !token.is_empty()) {
        let (key, value) = match token.split_once('=') {
            Some((key, value)) => (decode(key), Some(decode(value))),
            None => (decode(token), None),
        };
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => values.push(value),
            None => groups.push((key, vec![value])),
        }
    }

    groups
        .iter()
        .map(|(key, values)| {
            values
                .iter()
                .map(|value| format!("{key}={}", value.as_deref().unwrap_or("null")))
                .collect::<Vec<_>>()
                .join("&")
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
