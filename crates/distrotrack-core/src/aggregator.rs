//! Per-camera track aggregation.
//!
//! Folds decoded [`FrameMessage`]s into a map from global id to trajectory,
//! evicts tracks that went quiet, and hands out immutable snapshots for
//! rendering so readers never hold a reference into the live map.

use crate::config::TrackingConfig;
use crate::message::FrameMessage;
use crate::track::{Sample, Space, Track};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Source frame dimensions and timestamp of the newest message.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameInfo {
    pub width: f64,
    pub height: f64,
    pub ts: f64,
}

impl FrameInfo {
    pub fn size(&self) -> crate::geometry::Size {
        crate::geometry::Size::new(self.width, self.height)
    }
}

/// Immutable, globally-id-sorted view of the live tracks.
pub type TrackSnapshot = Arc<[Track]>;

/// Statistics from one [`TrackAggregator::ingest`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub updated: usize,
    pub created: usize,
    pub evicted: usize,
    /// Detections with neither a global nor a local id.
    pub skipped: usize,
}

pub struct TrackAggregator {
    config: TrackingConfig,
    tracks: HashMap<i64, Track>,
    frame: FrameInfo,
    cached: Option<(f64, TrackSnapshot)>,
}

impl TrackAggregator {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            tracks: HashMap::new(),
            frame: FrameInfo::default(),
            cached: None,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Apply one frame message: record every detection, then drop stale ids.
    pub fn ingest(&mut self, msg: &FrameMessage) -> IngestReport {
        let now = msg.timestamp_or_now();
        let size = msg.frame_size();
        self.frame = FrameInfo {
            width: size.width,
            height: size.height,
            ts: now,
        };

        let mut report = IngestReport::default();
        for det in msg.detections() {
            let Some(gid) = det.key() else {
                trace!("Detection without track_id or global_id");
                report.skipped += 1;
                continue;
            };

            let image = det.foot_point();
            let (pos, space) = match det.world_point() {
                Some(world) => (world, Space::World),
                None => (image, Space::Image),
            };
            let sample = Sample {
                t: now,
                x: pos.x,
                y: pos.y,
                space,
                image,
            };

            let track = match self.tracks.entry(gid) {
                Entry::Occupied(entry) => {
                    let track = entry.into_mut();
                    track.record(sample);
                    report.updated += 1;
                    track
                }
                Entry::Vacant(entry) => {
                    report.created += 1;
                    entry.insert(Track::new(gid, sample, self.config.history_cap))
                }
            };
            track.local_id = det.track_id;
            track.confidence = det.confidence.filter(|c| c.is_finite());
        }

        report.evicted = self.evict_stale(now);
        report
    }

    /// Drop tracks idle for longer than the configured window. Returns how many went.
    pub fn evict_stale(&mut self, now: f64) -> usize {
        let limit = self.config.stale_after_secs;
        let before = self.tracks.len();
        self.tracks.retain(|gid, track| {
            let keep = track.idle_for(now) <= limit;
            if !keep {
                trace!(global_id = gid, "Evicting stale track");
            }
            keep
        });
        let evicted = before - self.tracks.len();
        if evicted > 0 {
            self.cached = None;
        }
        evicted
    }

    /// Sorted snapshot of live tracks. Rebuilt only when a message with a new
    /// timestamp arrived since the previous call.
    pub fn snapshot(&mut self) -> TrackSnapshot {
        if let Some((ts, snap)) = &self.cached {
            if *ts == self.frame.ts {
                return Arc::clone(snap);
            }
        }
        let mut tracks: Vec<Track> = self.tracks.values().cloned().collect();
        tracks.sort_by_key(|t| t.global_id);
        let snap: TrackSnapshot = tracks.into();
        self.cached = Some((self.frame.ts, Arc::clone(&snap)));
        snap
    }

    pub fn frame_info(&self) -> FrameInfo {
        self.frame
    }

    pub fn get(&self, global_id: i64) -> Option<&Track> {
        self.tracks.get(&global_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Forget everything (camera switched or view torn down).
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.frame = FrameInfo::default();
        self.cached = None;
    }
}

impl Default for TrackAggregator {
    fn default() -> Self {
        Self::new(TrackingConfig::default())
    }
}
