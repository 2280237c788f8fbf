//! One camera: video image, trajectory overlay, status and track badges.

use crate::theme::Theme;
use distrotrack_core::geometry::{cover_uv, Size};
use distrotrack_core::overlay::{OverlayCache, OverlayStyle};
use distrotrack_core::{ConnectionState, EncodedFrame, FitMode, RenderView, TrackSnapshot};
use egui::{self, Color32, ColorImage, Pos2, Rect, Rounding, Shape, Stroke, TextureHandle, Vec2};
use std::sync::Arc;
use tracing::debug;

// ── State ──────────────────────────────────────────────────────

/// Per-tile GPU texture and overlay cache; lives as long as the tile is shown.
pub struct CameraTile {
    camera_id: String,
    texture: Option<(u64, TextureHandle)>,
    overlay: OverlayCache,
}

/// Everything the tile needs for one repaint.
pub struct TileInput<'a> {
    pub title: &'a str,
    pub view: RenderView,
    /// Latest MJPEG image when the view is a stream.
    pub stream_frame: Option<Arc<EncodedFrame>>,
    pub snapshot: &'a TrackSnapshot,
    pub frame_size: Size,
    pub status: ConnectionState,
    pub style: OverlayStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileAction {
    /// The tile was clicked; the app focuses this camera.
    Focus(String),
}

impl CameraTile {
    pub fn new(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            texture: None,
            overlay: OverlayCache::new(),
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// Upload `frame` unless it is already the current texture. Undecodable
    /// images keep the previous texture.
    fn sync_texture(&mut self, ctx: &egui::Context, frame: &EncodedFrame) -> Option<&TextureHandle> {
        let stale = !matches!(&self.texture, Some((seq, _)) if *seq == frame.seq);
        if stale {
            match decode_jpeg(&frame.jpeg) {
                Some(image) => {
                    let name = format!("camera-{}", self.camera_id);
                    let handle = ctx.load_texture(name, image, egui::TextureOptions::LINEAR);
                    self.texture = Some((frame.seq, handle));
                }
                None => debug!(camera = %self.camera_id, seq = frame.seq, "Undecodable JPEG"),
            }
        }
        self.texture.as_ref().map(|(_, handle)| handle)
    }

    pub fn show(&mut self, ui: &mut egui::Ui, input: TileInput<'_>) -> Vec<TileAction> {
        let mut actions = Vec::new();
        let available = ui.available_size();
        let (response, painter) = ui.allocate_painter(available, egui::Sense::click());
        let rect = response.rect;
        painter.rect_filled(rect, Rounding::same(Theme::RADIUS), Theme::video_bg());

        // ── Image ──────────────────────────────────────────────
        let (frame, fit) = match &input.view {
            RenderView::Frame { frame, fit } => (Some(Arc::clone(frame)), *fit),
            RenderView::Stream { fit, .. } => (input.stream_frame.clone(), *fit),
            RenderView::Connecting | RenderView::NoStream => (None, FitMode::Fill),
        };
        let ctx = ui.ctx().clone();
        let texture = frame
            .as_deref()
            .and_then(|f| self.sync_texture(&ctx, f))
            .map(|t| (t.id(), t.size_vec2()));

        match texture {
            Some((id, px)) => {
                let uv = match fit {
                    FitMode::Fill => Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    FitMode::Cover => {
                        let frame_px = Size::new(px.x as f64, px.y as f64);
                        let view_px = Size::new(rect.width() as f64, rect.height() as f64);
                        match cover_uv(frame_px, view_px) {
                            Some((min, max)) => Rect::from_min_max(
                                Pos2::new(min.x as f32, min.y as f32),
                                Pos2::new(max.x as f32, max.y as f32),
                            ),
                            None => Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        }
                    }
                };
                painter.image(id, rect, uv, Color32::WHITE);
            }
            None => {
                let hint = match &input.view {
                    RenderView::NoStream => "No stream URL".to_string(),
                    _ => format!("Connecting {}\u{2026}", self.camera_id),
                };
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    hint,
                    egui::FontId::proportional(Theme::FONT_SM),
                    Theme::t2(),
                );
            }
        }

        // ── Trajectories ───────────────────────────────────────
        let viewport = Size::new(rect.width() as f64, rect.height() as f64);
        let stroke = Stroke::new(input.style.width, Theme::rgb(input.style.rgb));
        for line in self.overlay.get(input.snapshot, input.frame_size, viewport) {
            if line.points.len() < 2 {
                continue;
            }
            let points: Vec<Pos2> = line
                .points
                .iter()
                .map(|p| rect.min + Vec2::new(p.x as f32, p.y as f32))
                .collect();
            painter.add(Shape::line(points, stroke));
        }

        // ── Badges ─────────────────────────────────────────────
        let badge_font = egui::FontId::proportional(Theme::FONT_XS);
        let title = format!("{}  \u{2022} {}", input.title, input.status);
        let galley = painter.layout_no_wrap(title, badge_font.clone(), Theme::t1());
        let badge = Rect::from_min_size(
            rect.min + Vec2::splat(Theme::SPACE_SM),
            galley.size() + Vec2::new(Theme::SPACE_SM * 2.0 + 10.0, Theme::SPACE_XS * 2.0),
        );
        painter.rect_filled(badge, Rounding::same(Theme::RADIUS), Theme::scrim());
        painter.circle_filled(
            Pos2::new(badge.left() + Theme::SPACE_SM + 3.0, badge.center().y),
            3.5,
            Theme::status_color(input.status),
        );
        painter.galley(
            Pos2::new(
                badge.left() + Theme::SPACE_SM + 10.0,
                badge.top() + Theme::SPACE_XS,
            ),
            galley,
            Theme::t1(),
        );

        if !input.snapshot.is_empty() {
            painter.text(
                Pos2::new(rect.right() - Theme::SPACE_SM, rect.top() + Theme::SPACE_SM + 2.0),
                egui::Align2::RIGHT_TOP,
                format!("{} tracked", input.snapshot.len()),
                badge_font,
                Theme::accent(),
            );
        }

        if response.clicked() {
            actions.push(TileAction::Focus(self.camera_id.clone()));
        }
        if response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }
        actions
    }
}

/// Decode a JPEG into an egui image.
pub fn decode_jpeg(bytes: &[u8]) -> Option<ColorImage> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg).ok()?;
    let rgba = decoded.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}
