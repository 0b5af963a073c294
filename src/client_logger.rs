//! Logging hooks for chat-completion traffic.
//!
//! This module provides the [`ClientLogger`] trait that captures every request
//! a provider sends and every fragment it streams back, and
//! [`JsonLinesLogger`], which appends those records to a file as one JSON
//! object per line. API keys never reach the logger.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{ChatMessage, ExecutionSettings};

/// A trait for logging chat-completion traffic.
///
/// Implementations must be cheap to call: `log_fragment` runs once per
/// streamed fragment, between the network read and the terminal write.
pub trait ClientLogger: Send + Sync {
    /// Log an outgoing streaming request.
    fn log_request(
        &self,
        provider: &str,
        model: &str,
        transcript: &[ChatMessage],
        settings: &ExecutionSettings,
    );

    /// Log one streamed text fragment.
    fn log_fragment(&self, fragment: &str);

    /// Log the concatenated reply of a stream that completed naturally.
    fn log_reply(&self, reply: &str);

    /// Log a request or stream failure.
    fn log_error(&self, error: &Error);
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record<'a> {
    Request {
        provider: &'a str,
        model: &'a str,
        messages: &'a [ChatMessage],
        settings: &'a ExecutionSettings,
    },
    Fragment {
        text: &'a str,
    },
    Reply {
        text: &'a str,
    },
    Error {
        message: String,
    },
}

#[derive(Serialize)]
struct Line<'a> {
    timestamp_ms: u64,
    #[serde(flatten)]
    record: Record<'a>,
}

/// A [`ClientLogger`] that writes JSON lines to a file.
pub struct JsonLinesLogger {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesLogger {
    /// Opens `path` for appending, creating it if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| Error::io(format!("failed to open log {}", path.display()), err))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write(&self, record: Record<'_>) {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let line = Line {
            timestamp_ms,
            record,
        };
        // A record that cannot be written is dropped.
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if serde_json::to_writer(&mut *writer, &line).is_ok() {
            let _ = writer.write_all(b"\n");
            let _ = writer.flush();
        }
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(
        &self,
        provider: &str,
        model: &str,
        transcript: &[ChatMessage],
        settings: &ExecutionSettings,
    ) {
        self.write(Record::Request {
            provider,
            model,
            messages: transcript,
            settings,
        });
    }

    fn log_fragment(&self, fragment: &str) {
        self.write(Record::Fragment { text: fragment });
    }

    fn log_reply(&self, reply: &str) {
        self.write(Record::Reply { text: reply });
    }

    fn log_error(&self, error: &Error) {
        self.write(Record::Error {
            message: error.to_string(),
        });
    }
}
