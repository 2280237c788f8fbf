//! Socket payloads through a camera session into what the viewer draws.

use distrotrack_core::config::TrackingConfig;
use distrotrack_core::overlay::{project, OverlayCache};
use distrotrack_core::render::{renderer_for, DiscreteFrameRenderer};
use distrotrack_core::{
    CameraSession, FitMode, HistoryCard, Point, RenderMode, RenderView, ServerUrl, Size, Space,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// ── Helpers ────────────────────────────────────────────────────

// "hello"
const STILL: &str = "aGVsbG8=";

fn session_with(tracking: TrackingConfig) -> CameraSession {
    CameraSession::new(
        "cam1",
        tracking,
        Box::new(DiscreteFrameRenderer::new(Duration::from_millis(50))),
    )
}

fn session() -> CameraSession {
    session_with(TrackingConfig::default())
}

fn message(ts: f64, tracks: serde_json::Value) -> String {
    json!({ "frame_w": 640, "frame_h": 480, "timestamp": ts, "tracks": tracks }).to_string()
}

fn person(gid: i64, x: f64) -> serde_json::Value {
    json!({ "track_id": gid + 100, "global_id": gid, "confidence": 0.9, "bbox": [x, 100, 40, 200] })
}

// ── Tracks and frames ──────────────────────────────────────────

#[test]
fn throttled_stills_do_not_drop_track_samples() {
    let mut s = session();
    let mut with_still = |ts: f64| {
        let text = json!({
            "jpg": STILL, "frame_w": 640, "frame_h": 480, "timestamp": ts,
            "tracks": [person(1, 10.0 * ts)]
        })
        .to_string();
        s.handle_text(&text).unwrap()
    };

    assert!(with_still(1.00).frame_changed);
    assert!(!with_still(1.01).frame_changed);
    assert!(!with_still(1.02).frame_changed);
    assert!(with_still(1.10).frame_changed);

    let snap = s.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].history.len(), 4);
    match s.view() {
        RenderView::Frame { frame, fit } => {
            assert_eq!(fit, FitMode::Fill);
            assert_eq!(&frame.jpeg[..], b"hello");
            assert_eq!(frame.timestamp, 1.10);
        }
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[test]
fn tracks_idle_past_window_disappear() {
    let mut s = session();
    s.handle_text(&message(1.0, json!([person(1, 0.0), person(2, 50.0)])));
    s.handle_text(&message(20.0, json!([person(2, 60.0)])));
    assert_eq!(s.snapshot().len(), 2);

    let outcome = s
        .handle_text(&message(32.0, json!([person(3, 90.0)])))
        .unwrap();
    assert_eq!(outcome.tracks.created, 1);
    assert_eq!(outcome.tracks.evicted, 1);

    let ids: Vec<i64> = s.snapshot().iter().map(|t| t.global_id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn history_is_capped_per_track() {
    let mut s = session_with(TrackingConfig {
        history_cap: 5,
        ..TrackingConfig::default()
    });
    for i in 1..=12 {
        s.handle_text(&message(i as f64, json!([person(4, i as f64)])));
    }
    let snap = s.snapshot();
    let times: Vec<f64> = snap[0].history.iter().map(|p| p.t).collect();
    assert_eq!(times, vec![8.0, 9.0, 10.0, 11.0, 12.0]);
    assert_eq!(snap[0].last.t, 12.0);
}

#[test]
fn detections_fall_back_to_local_id() {
    let mut s = session();
    let outcome = s
        .handle_text(&message(
            1.0,
            json!([
                { "track_id": 5, "bbox": [0, 0, 10, 10] },
                { "bbox": [0, 0, 10, 10] }
            ]),
        ))
        .unwrap();
    assert_eq!(outcome.tracks.created, 1);
    assert_eq!(outcome.tracks.skipped, 1);
    assert_eq!(s.snapshot()[0].global_id, 5);
}

#[test]
fn malformed_payloads_change_nothing() {
    let mut s = session();
    s.handle_text(&message(1.0, json!([person(1, 0.0)])));
    assert!(s.handle_text("{ not json").is_none());
    assert!(s.handle_text("42").is_none());
    assert_eq!(s.snapshot()[0].history.len(), 1);
    assert_eq!(s.frame_info().ts, 1.0);
}

// ── Overlay and history ────────────────────────────────────────

#[test]
fn world_positions_in_history_image_points_in_overlay() {
    let mut s = session();
    s.handle_text(&message(
        5.0,
        json!([{ "global_id": 9, "track_id": 2, "confidence": 0.875,
                 "bbox": [100, 100, 40, 200], "world_xy": [3.5, 7.5] }]),
    ));
    let snap = s.snapshot();
    let track = &snap[0];
    assert!(track.world);
    assert_eq!(track.last.space, Space::World);
    assert_eq!(track.last.position(), Point::new(3.5, 7.5));

    let lines = project(&snap, s.frame_info().size(), Size::new(320.0, 240.0));
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].points, vec![Point::new(60.0, 150.0)]);

    let card = HistoryCard::from_track(track);
    assert_eq!(card.title, "Global ID: 9");
    assert_eq!(card.confidence.as_deref(), Some("87.5%"));
    assert_eq!(card.local_id, "2");
    assert_eq!(card.coords_label, "World Coords (x,y)");
    assert_eq!(card.coords, "3.5, 7.5");
    assert_eq!(card.points, 1);
}

#[test]
fn overlay_waits_for_frame_size() {
    let mut s = session();
    s.handle_text(&json!({ "timestamp": 1.0, "tracks": [person(1, 0.0)] }).to_string());
    let snap = s.snapshot();
    assert_eq!(snap.len(), 1);
    assert!(project(&snap, s.frame_info().size(), Size::new(320.0, 240.0)).is_empty());
}

#[test]
fn snapshot_and_overlay_reused_until_next_message() {
    let mut s = session();
    let mut cache = OverlayCache::new();
    let viewport = Size::new(640.0, 480.0);
    s.handle_text(&message(1.0, json!([person(1, 0.0), person(2, 200.0)])));

    let first = s.snapshot();
    let again = s.snapshot();
    assert!(Arc::ptr_eq(&first, &again));
    let lines = cache.get(&first, s.frame_info().size(), viewport).to_vec();
    assert_eq!(lines.len(), 2);
    assert_eq!(cache.get(&again, s.frame_info().size(), viewport), &lines[..]);

    s.handle_text(&message(2.0, json!([person(1, 10.0)])));
    let next = s.snapshot();
    assert!(!Arc::ptr_eq(&first, &next));
    let lines = cache.get(&next, s.frame_info().size(), viewport);
    assert_eq!(lines[0].points.len(), 2);
}

// ── Renderers and teardown ─────────────────────────────────────

#[test]
fn stream_mode_ignores_socket_stills() {
    let server = ServerUrl::parse("http://10.0.0.2:8000/").unwrap();
    let renderer = renderer_for(RenderMode::Stream, &server, "cam2", Duration::from_millis(50));
    let mut s = CameraSession::new("cam2", TrackingConfig::default(), renderer);

    let outcome = s
        .handle_text(
            &json!({ "jpg": STILL, "frame_w": 640, "frame_h": 480, "timestamp": 1.0,
                     "tracks": [person(1, 0.0)] })
            .to_string(),
        )
        .unwrap();
    assert!(!outcome.frame_changed);
    assert_eq!(outcome.tracks.created, 1);
    assert_eq!(
        s.view(),
        RenderView::Stream {
            url: "http://10.0.0.2:8000/stream/cam2".to_string(),
            fit: FitMode::Cover,
        }
    );
}

#[test]
fn teardown_forgets_everything() {
    let mut s = session();
    s.handle_text(
        &json!({ "jpg": STILL, "frame_w": 640, "frame_h": 480, "timestamp": 1.0,
                 "tracks": [person(1, 0.0)] })
        .to_string(),
    );
    s.teardown();
    assert!(!s.is_alive());
    assert!(s.snapshot().is_empty());
    assert_eq!(s.view(), RenderView::Connecting);
    assert!(s.handle_text(&message(2.0, json!([person(1, 5.0)]))).is_none());
    assert!(s.snapshot().is_empty());
}
