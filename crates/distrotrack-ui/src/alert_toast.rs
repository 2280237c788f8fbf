//! Floating banner for the current alert.

use crate::theme::Theme;
use distrotrack_core::{AlertLevel, AlertStore};
use egui::{self, Color32, RichText};
use std::time::{Duration, Instant};

fn fill(level: AlertLevel) -> Color32 {
    match level {
        AlertLevel::Info => Theme::bg3(),
        AlertLevel::Warning => Color32::from_rgb(146, 104, 14),
        AlertLevel::Error => Theme::red(),
    }
}

/// Expire the current alert if its time is up, then draw whatever is current.
/// Clicking the banner dismisses it early.
pub fn show_alert_toast(ctx: &egui::Context, store: &mut AlertStore, now: Instant) {
    store.expire(now);
    let Some(alert) = store.current() else {
        return;
    };
    let message = alert.message.clone();
    let level = alert.level;
    let waiting = store.queued();

    let response = egui::Area::new(egui::Id::new("alert-toast"))
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 48.0))
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            Theme::toast_frame(fill(level))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&message).color(Theme::t1()).strong());
                        if waiting > 0 {
                            ui.label(
                                RichText::new(format!("+{waiting}"))
                                    .size(Theme::FONT_XS)
                                    .color(Theme::t2()),
                            );
                        }
                    });
                })
                .response
                .interact(egui::Sense::click())
        })
        .inner;

    if response.clicked() {
        store.pop();
    }
    // Wake up again to expire the banner even when nothing else repaints.
    ctx.request_repaint_after(Duration::from_millis(250));
}
