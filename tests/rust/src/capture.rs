//! Log capture for asserting on encoder output.
//!
//! Installs the real `JsonLineFormat` encoder over an in-memory writer so
//! tests observe exactly the bytes a log shipper would.

use std::io;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::Subscriber;
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

use reqtrail_gateway::JsonLineFormat;

/// Clone-friendly in-memory log sink.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().expect("capture lock poisoned");
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Parsed JSON records, one per captured line.
    pub fn records(&self) -> Vec<Value> {
        self.contents()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .unwrap_or_else(|err| panic!("log line is not JSON ({err}): {line}"))
            })
            .collect()
    }

    /// The `message` field of every record, in emission order.
    pub fn messages(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|record| {
                record["message"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    /// Messages starting with the given audit marker (`REQUEST`/`RESPONSE`).
    pub fn audit_lines(&self, marker: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|message| message.starts_with(marker))
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().expect("capture lock poisoned");
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Subscriber with the default (UTC) JSON line encoder writing into `capture`.
pub fn subscriber(capture: &LogCapture) -> impl Subscriber + Send + Sync {
    subscriber_with_format(capture, JsonLineFormat::new())
}

/// Subscriber with an explicit encoder configuration.
pub fn subscriber_with_format(
    capture: &LogCapture,
    format: JsonLineFormat,
) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .event_format(format)
        .with_writer(capture.clone())
        .finish()
}

/// Extract the header-summary JSON object from a request audit line.
pub fn header_json(line: &str) -> Value {
    let marker = "HEADERS\t : ";
    let start = line.find(marker).expect("request line has no HEADERS section") + marker.len();
    let rest = &line[start..];
    let end = rest
        .find('\t')
        .or_else(|| rest.find("END-REQUEST"))
        .unwrap_or(rest.len());
    serde_json::from_str(&rest[..end]).expect("header section is not JSON")
}
