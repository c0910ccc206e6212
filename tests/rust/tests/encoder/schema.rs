//! Record schema: fixed fields, severities, timestamps, line shape.

use chrono::{DateTime, FixedOffset};
use pretty_assertions::assert_eq;
use tracing::{debug, error, info, trace, warn};

use reqtrail_core::CorrelationContext;
use reqtrail_gateway::JsonLineFormat;
use tests::{subscriber, subscriber_with_format, LogCapture};

fn sample_context(id: &str) -> CorrelationContext {
    CorrelationContext {
        correlation_id: id.to_string(),
        user_agent: None,
        client_ip: "127.0.0.1".to_string(),
    }
}

#[tokio::test]
async fn record_carries_the_fixed_schema() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    sample_context("abc")
        .scope(async {
            info!("hello world");
        })
        .await;

    let records = capture.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["severity"], 20_000);
    assert_eq!(record["logId"], "abc");
    assert_eq!(record["logType"], "JSON");
    assert_eq!(record["level"], "INFO");
    assert_eq!(record["message"], "hello world");
    assert!(record["logger"]
        .as_str()
        .expect("logger present")
        .contains("schema"));
    assert!(!record["thread"]
        .as_str()
        .expect("thread present")
        .is_empty());

    let timestamp = record["timestamp"].as_str().expect("timestamp present");
    DateTime::<FixedOffset>::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.3f%:z")
        .expect("timestamp matches the fixed pattern");
}

#[test]
fn severity_follows_the_level() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    error!("e");
    warn!("w");
    info!("i");
    debug!("d");
    trace!("t");

    let severities: Vec<u64> = capture
        .records()
        .iter()
        .map(|record| record["severity"].as_u64().expect("severity is numeric"))
        .collect();
    assert_eq!(severities, vec![40_000, 30_000, 20_000, 10_000, 5_000]);
}

#[test]
fn log_id_is_empty_outside_a_request_scope() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    info!("no scope here");

    assert_eq!(capture.records()[0]["logId"], "");
}

#[test]
fn records_are_single_lines_even_for_multiline_messages() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    info!("first\nsecond");
    info!("third");

    let contents = capture.contents();
    assert_eq!(contents.lines().count(), 2);
    assert_eq!(capture.records()[0]["message"], "first\nsecond");
}

#[test]
fn event_fields_are_preserved_verbatim() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(subscriber(&capture));

    info!(status = 200u64, route = "/api/items", "request done");

    let record = &capture.records()[0];
    assert_eq!(record["status"], 200);
    assert_eq!(record["route"], "/api/items");
    assert_eq!(record["message"], "request done");
}

#[test]
fn timestamps_honor_a_fixed_non_utc_offset() {
    let capture = LogCapture::new();
    let offset = FixedOffset::east_opt(7 * 3600).expect("valid offset");
    let _guard = tracing::subscriber::set_default(subscriber_with_format(
        &capture,
        JsonLineFormat::with_timezone(offset),
    ));

    info!("offset check");

    let timestamp = capture.records()[0]["timestamp"]
        .as_str()
        .expect("timestamp present")
        .to_string();
    assert!(timestamp.ends_with("+07:00"), "timestamp: {timestamp}");
}
