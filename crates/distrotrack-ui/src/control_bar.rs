//! Top bar: camera selector, server field and camera controls.

use crate::theme::Theme;
use distrotrack_core::config::CameraConfig;
use egui::{self, RichText};
use serde::{Deserialize, Serialize};

// ── Selection ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraSelection {
    /// 2×2 grid of every configured camera.
    #[default]
    All,
    One(String),
}

impl CameraSelection {
    pub fn label<'a>(&'a self, cameras: &'a [CameraConfig]) -> &'a str {
        match self {
            Self::All => "All Cameras",
            Self::One(id) => cameras
                .iter()
                .find(|c| &c.id == id)
                .map(|c| c.display_name())
                .unwrap_or(id.as_str()),
        }
    }
}

// ── State ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ControlBarState {
    pub server_input: String,
    pub recording: bool,
    /// A control request is in flight.
    pub busy: bool,
}

impl ControlBarState {
    pub fn new(server: &str) -> Self {
        Self {
            server_input: server.to_string(),
            ..Default::default()
        }
    }
}

// ── Actions ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    Select(CameraSelection),
    SetServer(String),
    StartCamera(String),
    StopCamera(String),
    RecordCamera(String, bool),
    StartAll,
    StopAll,
    RecordAll(bool),
    RefreshStatus,
    OpenCalibration,
}

// ── Rendering ──────────────────────────────────────────────────

pub fn show_control_bar(
    ui: &mut egui::Ui,
    state: &mut ControlBarState,
    cameras: &[CameraConfig],
    selection: &CameraSelection,
) -> Vec<ControlAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.label(
            RichText::new("DistroTrack")
                .size(Theme::FONT_LG)
                .color(Theme::accent())
                .strong(),
        );
        ui.add_space(Theme::SPACE_MD);

        egui::ComboBox::from_id_salt("camera-select")
            .selected_text(selection.label(cameras))
            .show_ui(ui, |ui| {
                let mut choice = selection.clone();
                ui.selectable_value(&mut choice, CameraSelection::All, "All Cameras");
                for cam in cameras {
                    ui.selectable_value(
                        &mut choice,
                        CameraSelection::One(cam.id.clone()),
                        cam.display_name(),
                    );
                }
                if &choice != selection {
                    actions.push(ControlAction::Select(choice));
                }
            });

        ui.add_space(Theme::SPACE_SM);
        ui.add_enabled_ui(!state.busy, |ui| match selection {
            CameraSelection::All => {
                if ui.button("Start all").clicked() {
                    actions.push(ControlAction::StartAll);
                }
                if ui.button("Stop all").clicked() {
                    actions.push(ControlAction::StopAll);
                }
                if ui.toggle_value(&mut state.recording, "\u{23FA} Record all").changed() {
                    actions.push(ControlAction::RecordAll(state.recording));
                }
            }
            CameraSelection::One(id) => {
                if ui.button("Start").clicked() {
                    actions.push(ControlAction::StartCamera(id.clone()));
                }
                if ui.button("Stop").clicked() {
                    actions.push(ControlAction::StopCamera(id.clone()));
                }
                if ui.toggle_value(&mut state.recording, "\u{23FA} Record").changed() {
                    actions.push(ControlAction::RecordCamera(id.clone(), state.recording));
                }
            }
        });
        if ui.button("Status").clicked() {
            actions.push(ControlAction::RefreshStatus);
        }
        if ui.button("Calibrate\u{2026}").clicked() {
            actions.push(ControlAction::OpenCalibration);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let apply = ui.button("Apply").clicked();
            let field = ui.add(
                egui::TextEdit::singleline(&mut state.server_input)
                    .desired_width(220.0)
                    .hint_text("http://host:8000"),
            );
            let entered = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if apply || entered {
                actions.push(ControlAction::SetServer(state.server_input.clone()));
            }
            ui.label(RichText::new("Server").size(Theme::FONT_XS).color(Theme::t3()));
        });
    });

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_label() {
        let cams = vec![
            CameraConfig::new("cam1"),
            CameraConfig {
                id: "cam2".into(),
                name: Some("Loading dock".into()),
            },
        ];
        assert_eq!(CameraSelection::All.label(&cams), "All Cameras");
        assert_eq!(CameraSelection::One("cam2".into()).label(&cams), "Loading dock");
        assert_eq!(CameraSelection::One("cam9".into()).label(&cams), "cam9");
    }
}
