//! Wire format of the per-camera streaming socket.
//!
//! Every text message is a JSON object:
//!
//! ```text
//! { "jpg": "<base64>", "frame_w": 1280, "frame_h": 720, "timestamp": 1712.5,
//!   "tracks": [ { "track_id": 3, "global_id": 12, "confidence": 0.91,
//!                 "bbox": [x, y, w, h], "world_xy": [2.0, 3.5] } ] }
//! ```
//!
//! Upstream data is often incomplete, so every field is optional here and the
//! accessors supply the fallbacks.

use crate::error::Result;
use crate::geometry::{BBox, Point, Size};
use serde::{Deserialize, Serialize};

/// One decoded socket message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMessage {
    /// Base64-encoded JPEG still.
    #[serde(default)]
    pub jpg: Option<String>,
    #[serde(default)]
    pub frame_w: Option<f64>,
    #[serde(default)]
    pub frame_h: Option<f64>,
    /// Server time in seconds.
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub tracks: Option<Vec<Detection>>,
}

impl FrameMessage {
    /// Decode a socket text payload.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Source frame size; unknown dimensions are zero.
    pub fn frame_size(&self) -> Size {
        Size::new(
            self.frame_w.filter(|w| w.is_finite()).unwrap_or(0.0),
            self.frame_h.filter(|h| h.is_finite()).unwrap_or(0.0),
        )
    }

    /// Message timestamp, falling back to the local wall clock when the
    /// server omitted it (or sent zero).
    pub fn timestamp_or_now(&self) -> f64 {
        match self.timestamp {
            Some(t) if t.is_finite() && t != 0.0 => t,
            _ => now_secs(),
        }
    }

    pub fn detections(&self) -> &[Detection] {
        self.tracks.as_deref().unwrap_or(&[])
    }
}

/// A single person detection inside a frame message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Per-camera tracker id.
    #[serde(default)]
    pub track_id: Option<i64>,
    /// Cross-camera identity assigned by the server.
    #[serde(default)]
    pub global_id: Option<i64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    /// Kept untyped: malformed values fall back to image space instead of
    /// failing the whole message.
    #[serde(default)]
    pub world_xy: Option<serde_json::Value>,
}

impl Detection {
    /// Identity used as the track key: the global id, else the local one.
    pub fn key(&self) -> Option<i64> {
        self.global_id.or(self.track_id)
    }

    pub fn bbox(&self) -> BBox {
        self.bbox.as_deref().map(BBox::from_slice).unwrap_or_default()
    }

    pub fn foot_point(&self) -> Point {
        self.bbox().foot_point()
    }

    /// World coordinates, if `world_xy` is an array of at least two finite numbers.
    pub fn world_point(&self) -> Option<Point> {
        let items = self.world_xy.as_ref()?.as_array()?;
        if items.len() < 2 {
            return None;
        }
        let p = Point::new(items[0].as_f64()?, items[1].as_f64()?);
        p.is_finite().then_some(p)
    }
}

/// Wall-clock time in seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
