//! Single-line JSON event encoding.
//!
//! Renders every tracing event, not only the audit lines, as one compact
//! JSON object per line, carrying the numeric severity, the ambient
//! correlation id, and a fixed record-type marker. Encoder failures surface
//! as `fmt::Error`, which the subscriber swallows; they never reach request
//! handling.

use std::fmt::{self, Write as _};

use chrono::{FixedOffset, Offset, Utc};
use serde_json::{Map, Value};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
};

use reqtrail_core::context;

/// Fixed record-type marker present on every record.
const LOG_TYPE: &str = "JSON";

/// Timestamp pattern: ISO-8601 with millisecond precision and offset.
const TIMESTAMP_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// logback-compatible numeric severities, kept for aggregator parity.
fn severity(level: &Level) -> u32 {
    match *level {
        Level::ERROR => 40_000,
        Level::WARN => 30_000,
        Level::INFO => 20_000,
        Level::DEBUG => 10_000,
        Level::TRACE => 5_000,
    }
}

/// Event formatter producing one JSON object per line.
pub struct JsonLineFormat {
    offset: FixedOffset,
}

impl JsonLineFormat {
    /// Format with UTC timestamps.
    pub fn new() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Format with timestamps in a fixed non-UTC offset.
    pub fn with_timezone(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for JsonLineFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for JsonLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut record = Map::new();
        record.insert(
            "timestamp".to_string(),
            Value::String(
                Utc::now()
                    .with_timezone(&self.offset)
                    .format(TIMESTAMP_PATTERN)
                    .to_string(),
            ),
        );
        record.insert("severity".to_string(), Value::from(severity(meta.level())));
        record.insert(
            "logId".to_string(),
            Value::String(context::correlation_id().unwrap_or_default()),
        );
        record.insert("logType".to_string(), Value::String(LOG_TYPE.to_string()));
        record.insert(
            "level".to_string(),
            Value::String(meta.level().to_string()),
        );
        record.insert(
            "logger".to_string(),
            Value::String(meta.target().to_string()),
        );
        record.insert("thread".to_string(), Value::String(thread_name()));
        record.insert(
            "message".to_string(),
            Value::String(visitor.message.unwrap_or_default()),
        );

        if *meta.level() == Level::ERROR {
            if let Some(trace) = visitor.stack_trace.take().or_else(|| visitor.failure.take()) {
                record.insert("stackTrace".to_string(), Value::String(trace));
            }
        }
        for (key, value) in visitor.fields {
            record.insert(key, value);
        }

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

fn thread_name() -> String {
    let current = std::thread::current();
    current
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", current.id()))
}

/// Collects event fields, routing the well-known ones to their record slots.
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    stack_trace: Option<String>,
    failure: Option<String>,
    fields: Vec<(String, Value)>,
}

impl FieldVisitor {
    fn dispatch(&mut self, name: &str, text: String) {
        match name {
            "message" => self.message = Some(text),
            "stack_trace" => self.stack_trace = Some(text),
            "error" => {
                self.failure = Some(text.clone());
                self.fields.push((name.to_string(), Value::String(text)));
            }
            _ => self.fields.push((name.to_string(), Value::String(text))),
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields
            .push((field.name().to_string(), Value::from(value)));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .push((field.name().to_string(), Value::from(value)));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .push((field.name().to_string(), Value::from(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .push((field.name().to_string(), Value::from(value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.dispatch(field.name(), value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.dispatch(field.name(), super::error_chain(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.dispatch(field.name(), format!("{value:?}"));
    }
}
