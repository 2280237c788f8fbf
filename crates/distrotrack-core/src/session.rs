//! One camera's client-side state: track history plus frame renderer.
//!
//! Every message feeds the aggregator; only the renderer applies its
//! throttle, so skipped stills never cost trajectory accuracy.

use crate::aggregator::{FrameInfo, IngestReport, TrackAggregator, TrackSnapshot};
use crate::config::TrackingConfig;
use crate::message::FrameMessage;
use crate::render::{FrameRenderer, RenderView};
use tracing::trace;

/// Result of handling one socket message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageOutcome {
    pub tracks: IngestReport,
    pub frame_changed: bool,
}

pub struct CameraSession {
    camera_id: String,
    aggregator: TrackAggregator,
    renderer: Box<dyn FrameRenderer>,
    alive: bool,
}

impl CameraSession {
    pub fn new(
        camera_id: impl Into<String>,
        tracking: TrackingConfig,
        renderer: Box<dyn FrameRenderer>,
    ) -> Self {
        Self {
            camera_id: camera_id.into(),
            aggregator: TrackAggregator::new(tracking),
            renderer,
            alive: true,
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// Decode and apply a raw socket payload. Malformed payloads are dropped.
    /// Returns `None` if nothing was applied.
    pub fn handle_text(&mut self, text: &str) -> Option<MessageOutcome> {
        if !self.alive {
            return None;
        }
        match FrameMessage::parse(text) {
            Ok(msg) => self.handle_message(&msg),
            Err(e) => {
                trace!(camera = %self.camera_id, error = %e, "Dropping malformed message");
                None
            }
        }
    }

    pub fn handle_message(&mut self, msg: &FrameMessage) -> Option<MessageOutcome> {
        if !self.alive {
            return None;
        }
        let tracks = self.aggregator.ingest(msg);
        let frame_changed = self.renderer.offer(msg);
        Some(MessageOutcome {
            tracks,
            frame_changed,
        })
    }

    pub fn snapshot(&mut self) -> TrackSnapshot {
        self.aggregator.snapshot()
    }

    pub fn frame_info(&self) -> FrameInfo {
        self.aggregator.frame_info()
    }

    pub fn view(&self) -> RenderView {
        self.renderer.view()
    }

    pub fn renderer(&self) -> &dyn FrameRenderer {
        self.renderer.as_ref()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Stop accepting updates and forget all state.
    pub fn teardown(&mut self) {
        self.alive = false;
        self.aggregator.reset();
        self.renderer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DiscreteFrameRenderer;
    use std::time::Duration;

    fn session() -> CameraSession {
        CameraSession::new(
            "cam1",
            TrackingConfig::default(),
            Box::new(DiscreteFrameRenderer::new(Duration::from_millis(50))),
        )
    }

    fn payload(ts: f64, gid: i64) -> String {
        format!(
            r#"{{"jpg":"aGVsbG8=","frame_w":640,"frame_h":480,"timestamp":{ts},
                "tracks":[{{"track_id":1,"global_id":{gid},"bbox":[0,0,10,10]}}]}}"#
        )
    }

    #[test]
    fn test_throttled_frame_still_records_tracks() {
        let mut s = session();
        let first = s.handle_text(&payload(1.000, 7)).unwrap();
        let second = s.handle_text(&payload(1.010, 7)).unwrap();
        assert!(first.frame_changed);
        assert!(!second.frame_changed);
        assert_eq!(second.tracks.updated, 1);

        let snap = s.snapshot();
        assert_eq!(snap[0].history.len(), 2);
    }

    #[test]
    fn test_malformed_payload_dropped() {
        let mut s = session();
        assert!(s.handle_text("{not json").is_none());
        assert!(s.snapshot().is_empty());
        assert_eq!(s.view(), RenderView::Connecting);
    }

    #[test]
    fn test_no_updates_after_teardown() {
        let mut s = session();
        s.handle_text(&payload(1.0, 1));
        s.teardown();
        assert!(s.handle_text(&payload(2.0, 2)).is_none());
        assert!(s.snapshot().is_empty());
        assert_eq!(s.frame_info(), FrameInfo::default());
        assert_eq!(s.view(), RenderView::Connecting);
    }
}
