//! Scrollable list of per-track movement history cards.

use crate::theme::Theme;
use distrotrack_core::{HistoryCard, Space};
use egui::{self, RichText};

pub fn show_history_panel(ui: &mut egui::Ui, camera: &str, cards: &[HistoryCard]) {
    ui.label(
        RichText::new(format!("Movement history \u{00B7} {camera}"))
            .size(Theme::FONT_LG)
            .color(Theme::t1())
            .strong(),
    );
    ui.add_space(Theme::SPACE_SM);

    if cards.is_empty() {
        ui.label(RichText::new("No tracks yet").color(Theme::t2()));
        return;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for card in cards {
                show_card(ui, card);
                ui.add_space(Theme::SPACE_SM);
            }
        });
}

fn show_card(ui: &mut egui::Ui, card: &HistoryCard) {
    Theme::card_frame().show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(&card.title)
                    .size(Theme::FONT_MD)
                    .color(Theme::t1())
                    .strong(),
            );
            if let Some(conf) = &card.confidence {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(RichText::new(conf).color(Theme::accent()));
                });
            }
        });

        let meta = |ui: &mut egui::Ui, key: &str, value: &str| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(key).size(Theme::FONT_XS).color(Theme::t3()));
                ui.label(RichText::new(value).size(Theme::FONT_SM).color(Theme::t2()));
            });
        };
        meta(ui, "Local ID", &card.local_id);
        meta(ui, card.coords_label, &card.coords);
        meta(ui, "Points", &card.points.to_string());
        meta(ui, "Last update", &card.last_update);

        if !card.recent.is_empty() {
            ui.add_space(Theme::SPACE_XS);
            egui::CollapsingHeader::new(RichText::new("Recent").size(Theme::FONT_XS))
                .id_salt(("recent", card.global_id))
                .show(ui, |ui| {
                    for line in &card.recent {
                        let tag = match line.space {
                            Space::World => "W",
                            Space::Image => "I",
                        };
                        ui.label(
                            RichText::new(format!("{}  {}  {}", line.time, line.position, tag))
                                .monospace()
                                .size(Theme::FONT_XS)
                                .color(Theme::t2()),
                        );
                    }
                });
        }
    });
}
