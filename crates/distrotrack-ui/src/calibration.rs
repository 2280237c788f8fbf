//! Homography calibration form: four image points and their world positions.

use crate::theme::Theme;
use distrotrack_net::HomographyRequest;
use egui::{self, RichText};

const POINTS: usize = HomographyRequest::POINTS;

/// Raw text of every field, kept as typed so partial input survives redraws.
#[derive(Debug, Clone, Default)]
pub struct CalibrationState {
    pub camera_id: String,
    pub image: [[String; 2]; POINTS],
    pub world: [[String; 2]; POINTS],
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationAction {
    Submit(HomographyRequest),
    Close,
}

impl CalibrationState {
    pub fn new(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            ..Default::default()
        }
    }

    /// Parse every field. The message names the first bad field.
    pub fn to_request(&self) -> Result<HomographyRequest, String> {
        if self.camera_id.trim().is_empty() {
            return Err("Choose a camera".to_string());
        }
        let parse = |fields: &[[String; 2]; POINTS], kind: &str| {
            fields
                .iter()
                .enumerate()
                .map(|(i, [x, y])| {
                    let coord = |raw: &str, axis: &str| {
                        raw.trim()
                            .parse::<f64>()
                            .ok()
                            .filter(|v| v.is_finite())
                            .ok_or_else(|| format!("Point {} {kind} {axis} is not a number", i + 1))
                    };
                    Ok([coord(x, "x")?, coord(y, "y")?])
                })
                .collect::<Result<Vec<[f64; 2]>, String>>()
        };
        Ok(HomographyRequest {
            camera_id: self.camera_id.trim().to_string(),
            image_xy: parse(&self.image, "image")?,
            world_xy: parse(&self.world, "world")?,
        })
    }
}

pub fn show_calibration(
    ctx: &egui::Context,
    state: &mut CalibrationState,
    cameras: &[String],
) -> Vec<CalibrationAction> {
    let mut actions = Vec::new();
    let mut open = true;

    egui::Window::new("Calibration")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            egui::ComboBox::from_label("Camera")
                .selected_text(state.camera_id.as_str())
                .show_ui(ui, |ui| {
                    for cam in cameras {
                        ui.selectable_value(&mut state.camera_id, cam.clone(), cam.as_str());
                    }
                });
            ui.add_space(Theme::SPACE_SM);

            egui::Grid::new("calibration-points")
                .num_columns(5)
                .spacing([Theme::SPACE_SM, Theme::SPACE_XS])
                .show(ui, |ui| {
                    for header in ["#", "image x", "image y", "world x", "world y"] {
                        ui.label(RichText::new(header).size(Theme::FONT_XS).color(Theme::t3()));
                    }
                    ui.end_row();
                    for i in 0..POINTS {
                        ui.label((i + 1).to_string());
                        for field in state.image[i].iter_mut().chain(state.world[i].iter_mut()) {
                            ui.add(egui::TextEdit::singleline(field).desired_width(64.0));
                        }
                        ui.end_row();
                    }
                });

            if let Some(err) = &state.error {
                ui.label(RichText::new(err).color(Theme::red()));
            }
            ui.add_space(Theme::SPACE_SM);
            if ui.button("Save homography").clicked() {
                match state.to_request() {
                    Ok(request) => {
                        state.error = None;
                        actions.push(CalibrationAction::Submit(request));
                    }
                    Err(e) => state.error = Some(e),
                }
            }
        });

    if !open {
        actions.push(CalibrationAction::Close);
    }
    actions
}
