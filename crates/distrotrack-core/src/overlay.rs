//! Trajectory overlay projection.
//!
//! Maps each track's image-space foot points onto the on-screen viewport with
//! independent per-axis scaling, producing one polyline per global id.

use crate::config::OverlayConfig;
use crate::error::Result;
use crate::geometry::{AxisScale, Point, Size};
use crate::track::Track;
use std::sync::Arc;

/// Uniform stroke applied to every trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub rgb: [u8; 3],
    pub width: f32,
}

impl OverlayStyle {
    pub fn from_config(config: &OverlayConfig) -> Result<Self> {
        Ok(Self {
            rgb: config.rgb()?,
            width: config.width,
        })
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            rgb: [0x3b, 0x82, 0xf6],
            width: 3.0,
        }
    }
}

/// Screen-space path of one tracked object.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub global_id: i64,
    pub points: Vec<Point>,
}

/// Project every track's history into viewport pixels.
///
/// Nothing is produced while either the source frame size or the viewport
/// size is still unknown.
pub fn project(tracks: &[Track], frame: Size, viewport: Size) -> Vec<Polyline> {
    let Some(scale) = AxisScale::between(frame, viewport) else {
        return Vec::new();
    };
    tracks
        .iter()
        .filter(|t| !t.history.is_empty())
        .map(|t| Polyline {
            global_id: t.global_id,
            points: t.history.iter().map(|s| scale.apply(s.image)).collect(),
        })
        .collect()
}

/// Caches the last projection so a redraw with an unchanged snapshot and
/// viewport does not redo the work.
#[derive(Default)]
pub struct OverlayCache {
    snapshot: Option<Arc<[Track]>>,
    sizes: [u64; 4],
    lines: Vec<Polyline>,
}

impl OverlayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot identity is its allocation, which the aggregator only
    /// replaces when new data arrived.
    pub fn get(&mut self, snapshot: &Arc<[Track]>, frame: Size, viewport: Size) -> &[Polyline] {
        let sizes = [
            frame.width.to_bits(),
            frame.height.to_bits(),
            viewport.width.to_bits(),
            viewport.height.to_bits(),
        ];
        let fresh = match &self.snapshot {
            Some(cached) => Arc::ptr_eq(cached, snapshot) && self.sizes == sizes,
            None => false,
        };
        if !fresh {
            self.lines = project(snapshot, frame, viewport);
            self.snapshot = Some(Arc::clone(snapshot));
            self.sizes = sizes;
        }
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::TrackAggregator;
    use crate::message::{Detection, FrameMessage};

    fn snapshot_with_point(u: f64, v: f64) -> Arc<[Track]> {
        let mut agg = TrackAggregator::default();
        // bbox whose foot point is (u, v)
        let msg = FrameMessage {
            timestamp: Some(1.0),
            frame_w: Some(640.0),
            frame_h: Some(480.0),
            tracks: Some(vec![Detection {
                global_id: Some(1),
                bbox: Some(vec![u, v, 0.0, 0.0]),
                ..Default::default()
            }]),
            ..Default::default()
        };
        agg.ingest(&msg);
        agg.snapshot()
    }

    #[test]
    fn test_project_scales_axes_independently() {
        let snap = snapshot_with_point(100.0, 200.0);
        let lines = project(&snap, Size::new(640.0, 480.0), Size::new(320.0, 240.0));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].global_id, 1);
        let p = lines[0].points[0];
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_unknown_sizes_render_nothing() {
        let snap = snapshot_with_point(100.0, 200.0);
        assert!(project(&snap, Size::new(0.0, 480.0), Size::new(320.0, 240.0)).is_empty());
        assert!(project(&snap, Size::new(640.0, 480.0), Size::new(320.0, 0.0)).is_empty());
    }

    #[test]
    fn test_world_tracks_draw_image_points() {
        let mut agg = TrackAggregator::default();
        let msg = FrameMessage {
            timestamp: Some(1.0),
            tracks: Some(vec![Detection {
                global_id: Some(3),
                bbox: Some(vec![10.0, 20.0, 30.0, 40.0]),
                world_xy: Some(serde_json::json!([1.0, 1.0])),
                ..Default::default()
            }]),
            ..Default::default()
        };
        agg.ingest(&msg);
        let snap = agg.snapshot();
        let lines = project(&snap, Size::new(100.0, 100.0), Size::new(100.0, 100.0));
        assert_eq!(lines[0].points[0], Point::new(25.0, 60.0));
    }

    #[test]
    fn test_cache_reuses_projection() {
        let snap = snapshot_with_point(10.0, 10.0);
        let mut cache = OverlayCache::new();
        let frame = Size::new(100.0, 100.0);
        let first = cache.get(&snap, frame, Size::new(50.0, 50.0)).to_vec();
        assert_eq!(first[0].points[0], Point::new(5.0, 5.0));
        let resized = cache.get(&snap, frame, Size::new(200.0, 200.0)).to_vec();
        assert_eq!(resized[0].points[0], Point::new(20.0, 20.0));
    }

    #[test]
    fn test_style_from_config() {
        let style = OverlayStyle::from_config(&OverlayConfig::default()).unwrap();
        assert_eq!(style, OverlayStyle::default());
    }
}
