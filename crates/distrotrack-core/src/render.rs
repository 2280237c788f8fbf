//! Full-frame image delivery.
//!
//! Two strategies sit behind one [`FrameRenderer`] trait; which one a camera
//! view uses is decided by the embedding application via [`RenderMode`]:
//!
//! - [`StreamRenderer`] points the view at the server's multipart JPEG stream
//!   and lets it play continuously, cropped to cover the viewport.
//! - [`DiscreteFrameRenderer`] swaps in the base64 still carried by each
//!   socket message, dropping stills that arrive closer together than the
//!   configured interval.

use crate::config::{RenderMode, ServerUrl};
use crate::geometry::Size;
use crate::message::FrameMessage;
use base64::Engine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// How an image is fitted into the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// Keep aspect, crop the overflow.
    Cover,
    /// Stretch each axis independently (matches the overlay projection).
    Fill,
}

/// An encoded still ready to be decoded by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    /// Increments on every accepted frame so views can tell frames apart cheaply.
    pub seq: u64,
    pub jpeg: Bytes,
    /// Size reported by the server for this frame (may be zero).
    pub size: Size,
    pub timestamp: f64,
}

/// What a camera tile should currently show.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderView {
    /// No source URL configured for this camera.
    NoStream,
    /// Waiting for the first image.
    Connecting,
    /// Continuous multipart stream at `url`.
    Stream { url: String, fit: FitMode },
    /// Latest discrete still.
    Frame { frame: Arc<EncodedFrame>, fit: FitMode },
}

pub trait FrameRenderer: Send {
    /// Offer a socket message. Returns `true` if the displayed image changed.
    fn offer(&mut self, msg: &FrameMessage) -> bool;

    fn view(&self) -> RenderView;

    /// Drop any displayed image.
    fn reset(&mut self);

    fn mode(&self) -> RenderMode;
}

/// Build the renderer for `mode`.
pub fn renderer_for(
    mode: RenderMode,
    server: &ServerUrl,
    camera_id: &str,
    frame_interval: Duration,
) -> Box<dyn FrameRenderer> {
    match mode {
        RenderMode::Stream => Box::new(StreamRenderer::new(Some(server.stream_url(camera_id)))),
        RenderMode::Discrete => Box::new(DiscreteFrameRenderer::new(frame_interval)),
    }
}

/// Continuous multipart stream; socket messages never change what it shows.
#[derive(Debug, Clone)]
pub struct StreamRenderer {
    url: Option<String>,
}

impl StreamRenderer {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl FrameRenderer for StreamRenderer {
    fn offer(&mut self, _msg: &FrameMessage) -> bool {
        false
    }

    fn view(&self) -> RenderView {
        match &self.url {
            Some(url) => RenderView::Stream {
                url: url.clone(),
                fit: FitMode::Cover,
            },
            None => RenderView::NoStream,
        }
    }

    fn reset(&mut self) {}

    fn mode(&self) -> RenderMode {
        RenderMode::Stream
    }
}

/// Throttled base64 stills from the tracking socket.
#[derive(Debug, Clone)]
pub struct DiscreteFrameRenderer {
    min_interval: f64,
    last_accepted: Option<f64>,
    current: Option<Arc<EncodedFrame>>,
    seq: u64,
}

impl DiscreteFrameRenderer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval: min_interval.as_secs_f64(),
            last_accepted: None,
            current: None,
            seq: 0,
        }
    }

    pub fn current(&self) -> Option<&Arc<EncodedFrame>> {
        self.current.as_ref()
    }

    fn too_soon(&self, now: f64) -> bool {
        if self.current.is_none() {
            return false;
        }
        match self.last_accepted {
            // A clock that went backwards restarts the throttle.
            Some(last) => {
                let dt = now - last;
                dt >= 0.0 && dt < self.min_interval
            }
            None => false,
        }
    }
}

/// Decode a base64 still, tolerating a `data:image/...;base64,` prefix.
pub fn decode_still(encoded: &str) -> Option<Bytes> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()
        .filter(|bytes| !bytes.is_empty())
        .map(Bytes::from)
}

impl FrameRenderer for DiscreteFrameRenderer {
    fn offer(&mut self, msg: &FrameMessage) -> bool {
        let Some(encoded) = msg.jpg.as_deref() else {
            return false;
        };
        let now = msg.timestamp_or_now();
        if self.too_soon(now) {
            return false;
        }
        let Some(jpeg) = decode_still(encoded) else {
            trace!("Dropping undecodable still");
            return false;
        };
        self.seq += 1;
        self.last_accepted = Some(now);
        self.current = Some(Arc::new(EncodedFrame {
            seq: self.seq,
            jpeg,
            size: msg.frame_size(),
            timestamp: now,
        }));
        true
    }

    fn view(&self) -> RenderView {
        match &self.current {
            Some(frame) => RenderView::Frame {
                frame: Arc::clone(frame),
                fit: FitMode::Fill,
            },
            None => RenderView::Connecting,
        }
    }

    fn reset(&mut self) {
        self.current = None;
        self.last_accepted = None;
    }

    fn mode(&self) -> RenderMode {
        RenderMode::Discrete
    }
}
