//! Night-watch dark theme: deep navy surfaces with cyan accents.

use distrotrack_core::ConnectionState;
use egui::{Color32, Rounding, Stroke, Vec2};

pub struct Theme;

impl Theme {
    // ── Typography ─────────────────────────────────────────────
    pub const FONT_XS: f32 = 11.0; // timestamps, badges
    pub const FONT_SM: f32 = 13.0; // body, buttons
    pub const FONT_MD: f32 = 15.0; // card titles
    pub const FONT_LG: f32 = 18.0; // panel titles

    // ── Spacing (4px base) ─────────────────────────────────────
    pub const SPACE_XS: f32 = 4.0;
    pub const SPACE_SM: f32 = 8.0;
    pub const SPACE_MD: f32 = 16.0;

    // ── Border radius ──────────────────────────────────────────
    pub const RADIUS: f32 = 6.0;
    pub const RADIUS_LG: f32 = 10.0;

    pub const STROKE_SUBTLE: f32 = 0.5;

    // ── Backgrounds ────────────────────────────────────────────
    pub const fn bg() -> Color32 {
        Color32::from_rgb(11, 18, 32)
    }
    pub const fn bg1() -> Color32 {
        Color32::from_rgb(17, 26, 44)
    }
    pub const fn bg2() -> Color32 {
        Color32::from_rgb(26, 37, 60)
    }
    pub const fn bg3() -> Color32 {
        Color32::from_rgb(36, 50, 78)
    }
    /// Camera tiles before the first image.
    pub const fn video_bg() -> Color32 {
        Color32::BLACK
    }

    // ── Text ───────────────────────────────────────────────────
    pub const fn t1() -> Color32 {
        Color32::from_rgb(226, 232, 240)
    }
    pub const fn t2() -> Color32 {
        Color32::from_rgb(148, 163, 184)
    }
    pub const fn t3() -> Color32 {
        Color32::from_rgb(100, 116, 139)
    }

    // ── Accent & semantic ──────────────────────────────────────
    pub const fn accent() -> Color32 {
        Color32::from_rgb(34, 211, 238)
    }
    pub const fn red() -> Color32 {
        Color32::from_rgb(244, 63, 94)
    }
    pub const fn green() -> Color32 {
        Color32::from_rgb(52, 211, 153)
    }
    pub const fn amber() -> Color32 {
        Color32::from_rgb(251, 191, 36)
    }
    pub const fn white_08() -> Color32 {
        Color32::from_rgba_premultiplied(20, 20, 20, 20)
    }
    pub const fn scrim() -> Color32 {
        Color32::from_rgba_premultiplied(0, 0, 0, 150)
    }

    /// Badge color for a socket status.
    pub fn status_color(state: ConnectionState) -> Color32 {
        match state {
            ConnectionState::Connected => Self::green(),
            ConnectionState::Connecting => Self::amber(),
            ConnectionState::Error => Self::red(),
            ConnectionState::Closed => Self::t3(),
        }
    }

    pub fn rgb([r, g, b]: [u8; 3]) -> Color32 {
        Color32::from_rgb(r, g, b)
    }

    // ── Frame builders ─────────────────────────────────────────

    pub fn panel_frame() -> egui::Frame {
        egui::Frame::none()
            .fill(Self::bg1())
            .inner_margin(egui::Margin::same(Self::SPACE_SM))
    }

    /// One history card.
    pub fn card_frame() -> egui::Frame {
        egui::Frame::none()
            .fill(Self::bg2())
            .stroke(Stroke::new(Self::STROKE_SUBTLE, Self::white_08()))
            .rounding(Rounding::same(Self::RADIUS_LG))
            .inner_margin(egui::Margin::same(Self::SPACE_SM + 2.0))
    }

    /// Floating alert banner.
    pub fn toast_frame(fill: Color32) -> egui::Frame {
        egui::Frame::none()
            .fill(fill)
            .rounding(Rounding::same(Self::RADIUS_LG))
            .inner_margin(egui::Margin::symmetric(Self::SPACE_MD, Self::SPACE_SM + 2.0))
            .shadow(egui::epaint::Shadow {
                offset: Vec2::new(0.0, 6.0),
                blur: 24.0,
                spread: 0.0,
                color: Color32::from_rgba_premultiplied(0, 0, 0, 110),
            })
    }

    pub fn apply(ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();
        let visuals = &mut style.visuals;
        *visuals = egui::Visuals::dark();

        visuals.panel_fill = Self::bg();
        visuals.window_fill = Self::bg1();
        visuals.extreme_bg_color = Self::bg();
        visuals.faint_bg_color = Self::bg1();

        visuals.widgets.noninteractive.bg_fill = Self::bg1();
        visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, Self::t2());
        visuals.widgets.noninteractive.rounding = Rounding::same(Self::RADIUS);

        visuals.widgets.inactive.bg_fill = Self::bg2();
        visuals.widgets.inactive.weak_bg_fill = Self::bg2();
        visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, Self::t1());
        visuals.widgets.inactive.rounding = Rounding::same(Self::RADIUS);

        visuals.widgets.hovered.bg_fill = Self::bg3();
        visuals.widgets.hovered.weak_bg_fill = Self::bg3();
        visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, Self::t1());
        visuals.widgets.hovered.rounding = Rounding::same(Self::RADIUS);

        visuals.widgets.active.bg_fill = Self::accent();
        visuals.widgets.active.fg_stroke = Stroke::new(1.0, Self::bg());
        visuals.widgets.active.rounding = Rounding::same(Self::RADIUS);

        visuals.selection.bg_fill = Self::accent();
        visuals.selection.stroke = Stroke::new(1.0, Self::bg());
        visuals.window_rounding = Rounding::same(Self::RADIUS_LG);

        ctx.set_style(style);
    }
}
