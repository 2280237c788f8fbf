//! Text view-model for the movement-history panel.

use crate::track::{Space, Track};
use chrono::{DateTime, Local, TimeZone};

/// Samples listed per card, newest first.
pub const RECENT_SAMPLES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLine {
    pub time: String,
    pub position: String,
    pub space: Space,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryCard {
    pub global_id: i64,
    pub title: String,
    /// `None` when the server sent no confidence.
    pub confidence: Option<String>,
    pub local_id: String,
    pub coords_label: &'static str,
    pub coords: String,
    pub points: usize,
    pub last_update: String,
    pub recent: Vec<HistoryLine>,
}

impl HistoryCard {
    pub fn from_track(track: &Track) -> Self {
        Self::from_track_in(track, &Local)
    }

    pub fn from_track_in<Tz: TimeZone>(track: &Track, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            global_id: track.global_id,
            title: format!("Global ID: {}", track.global_id),
            confidence: track.confidence.map(format_confidence),
            local_id: track
                .local_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            coords_label: if track.world {
                "World Coords (x,y)"
            } else {
                "Image Coords (u,v)"
            },
            coords: format!("{:.1}, {:.1}", track.last.x, track.last.y),
            points: track.history.len(),
            last_update: format_clock(track.last.t, tz),
            recent: track
                .history
                .recent(RECENT_SAMPLES)
                .map(|s| HistoryLine {
                    time: format_clock(s.t, tz),
                    position: format!("({:.1}, {:.1})", s.x, s.y),
                    space: s.space,
                })
                .collect(),
        }
    }
}

/// `0.9134` → `91.3%`
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Epoch seconds as a wall-clock time of day in `tz`; `-` if out of range.
pub fn format_clock<Tz: TimeZone>(t: f64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let secs = t.floor();
    let nanos = ((t - secs) * 1e9) as u32;
    match DateTime::from_timestamp(secs as i64, nanos.min(999_999_999)) {
        Some(utc) => utc.with_timezone(tz).format("%H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}
