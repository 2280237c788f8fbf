//! Incremental Server-Sent Events parser for the `/events` push stream.

use crate::error::Result;
use tracing::warn;

/// Upper bound on an unterminated line or on one event's accumulated data.
pub const MAX_BUFFERED: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field; `None` for the default "message" type.
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

/// Feed raw body chunks in arrival order; complete events come out as soon
/// as their terminating blank line is seen. Chunk boundaries may fall
/// anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
    id: Option<String>,
    /// Rest of an overlong line still to be thrown away.
    skip_line: bool,
    /// Current event was dropped; ignore fields until its blank line.
    skip_event: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(nl) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=nl).collect();
            if std::mem::take(&mut self.skip_line) {
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.line(&line) {
                events.push(event);
            }
        }
        if self.pending.len() > MAX_BUFFERED {
            warn!(buffered = self.pending.len(), "Event stream line too long, discarding");
            self.pending.clear();
            self.skip_line = true;
            self.drop_event();
        }
        events
    }

    fn drop_event(&mut self) {
        self.event = None;
        self.data.clear();
        self.data_len = 0;
        self.skip_event = true;
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if std::mem::take(&mut self.skip_event) {
                return None;
            }
            return self.dispatch();
        }
        if self.skip_event || line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                self.data_len += value.len() + 1;
                if self.data_len > MAX_BUFFERED {
                    warn!(buffered = self.data_len, "Event data too large, discarding");
                    self.drop_event();
                } else {
                    self.data.push(value.to_string());
                }
            }
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        self.data_len = 0;
        Some(SseEvent {
            event,
            data,
            id: self.id.clone(),
        })
    }
}
