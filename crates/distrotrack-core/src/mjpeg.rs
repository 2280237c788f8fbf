//! Incremental parser for `multipart/x-mixed-replace` JPEG streams
//! (the `/stream/<camId>` endpoint).
//!
//! Each part looks like:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: 51234\r\n
//! \r\n
//! <jpeg bytes>\r\n
//! ```
//!
//! `Content-Length` is used when present; otherwise a part ends at the next
//! boundary.

use bytes::{Buf, Bytes, BytesMut};
use tracing::warn;

/// Upper bound on buffered, not-yet-complete data.
pub const MAX_BUFFERED: usize = 16 * 1024 * 1024;

/// Extract the boundary from a `Content-Type` header value.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        let value = value.strip_prefix("--").unwrap_or(value);
        (!value.is_empty()).then(|| value.to_string())
    })
}

pub struct MjpegParser {
    delimiter: Vec<u8>,
    buf: BytesMut,
}

impl MjpegParser {
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = b"--".to_vec();
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            delimiter,
            buf: BytesMut::new(),
        }
    }

    /// Feed a body chunk; returns every part completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_part() {
            if !frame.is_empty() {
                frames.push(frame);
            }
        }
        if self.buf.len() > MAX_BUFFERED {
            warn!(buffered = self.buf.len(), "Multipart part too large, discarding");
            self.buf.clear();
        }
        frames
    }

    fn next_part(&mut self) -> Option<Bytes> {
        let start = find(&self.buf, &self.delimiter)?;
        if start > 0 {
            self.buf.advance(start);
        }
        let header_from = self.delimiter.len();
        let header_len = find(&self.buf[header_from..], b"\r\n\r\n")?;
        let body_start = header_from + header_len + 4;
        let content_length = content_length(&self.buf[header_from..header_from + header_len]);

        let body_end = match content_length {
            Some(len) => {
                let Some(end) = body_start
                    .checked_add(len)
                    .filter(|_| len <= MAX_BUFFERED)
                else {
                    warn!(content_length = len, "Multipart part length out of range, skipping");
                    self.buf.advance(body_start);
                    return Some(Bytes::new());
                };
                if self.buf.len() < end {
                    return None;
                }
                end
            }
            None => {
                let rel = find(&self.buf[body_start..], &self.delimiter)?;
                let mut end = body_start + rel;
                if self.buf[body_start..end].ends_with(b"\r\n") {
                    end -= 2;
                }
                end
            }
        };

        let frame = Bytes::copy_from_slice(&self.buf[body_start..body_end]);
        self.buf.advance(body_end);
        Some(frame)
    }
}

fn content_length(headers: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(headers).lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
