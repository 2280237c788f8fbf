//! DistroTrack UI - egui views for the surveillance client
//!
//! - Camera tiles with trajectory overlays
//! - Movement history cards
//! - Control bar, alert banner and calibration form

pub mod alert_toast;
pub mod calibration;
pub mod camera_tile;
pub mod control_bar;
pub mod history_panel;
pub mod theme;

pub use alert_toast::show_alert_toast;
pub use calibration::{show_calibration, CalibrationAction, CalibrationState};
pub use camera_tile::{CameraTile, TileAction, TileInput};
pub use control_bar::{show_control_bar, CameraSelection, ControlAction, ControlBarState};
pub use history_panel::show_history_panel;
pub use theme::Theme;
