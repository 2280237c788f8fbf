//! The windowed client.

use crate::control::{self, Command, Outcome};
use crate::feeds::FeedSet;
use crossbeam_channel::{Receiver, Sender};
use distrotrack_core::overlay::OverlayStyle;
use distrotrack_core::{Alert, AlertLevel, AlertStore, ClientConfig, HistoryCard, ServerUrl};
use distrotrack_net::CommandClient;
use distrotrack_ui::{
    show_alert_toast, show_calibration, show_control_bar, show_history_panel, CalibrationAction,
    CalibrationState, CameraSelection, ControlAction, ControlBarState, TileAction, TileInput,
    Theme,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const STATE_KEY: &str = "distrotrack";

/// Remembered between runs.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    server: Option<String>,
    selection: CameraSelection,
}

pub struct DistroTrackApp {
    runtime: Handle,
    config: ClientConfig,
    client: CommandClient,
    feeds: FeedSet,
    selection: CameraSelection,
    control_bar: ControlBarState,
    calibration: Option<CalibrationState>,
    alerts: AlertStore,
    style: OverlayStyle,
    results_tx: Sender<Outcome>,
    results_rx: Receiver<Outcome>,
    events_tx: Sender<Value>,
    events_rx: Receiver<Value>,
    events_task: Option<JoinHandle<()>>,
    events_seen: u64,
    pending: usize,
}

impl DistroTrackApp {
    /// `pinned_server` is a server given on the command line; it wins over
    /// the one remembered from the last run.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: Handle,
        config: ClientConfig,
        pinned_server: bool,
    ) -> anyhow::Result<Self> {
        Theme::apply(&cc.egui_ctx);

        let persisted: PersistedState = cc
            .storage
            .and_then(|s| eframe::get_value(s, STATE_KEY))
            .unwrap_or_default();

        let client = CommandClient::from_config(&config)?;
        if !pinned_server {
            if let Some(saved) = &persisted.server {
                if let Err(e) = client.set_server(saved) {
                    warn!(server = %saved, error = %e, "Ignoring remembered server");
                }
            }
        }

        let style = OverlayStyle::from_config(&config.overlay)?;
        let (results_tx, results_rx) = crossbeam_channel::unbounded();
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let feeds = FeedSet::new(runtime.clone(), config.clone(), cc.egui_ctx.clone());

        let selection = match persisted.selection {
            CameraSelection::One(id) if !config.cameras.iter().any(|c| c.id == id) => {
                CameraSelection::All
            }
            other => other,
        };

        let mut app = Self {
            runtime,
            control_bar: ControlBarState::new(client.server().as_str()),
            config,
            client,
            feeds,
            selection,
            calibration: None,
            alerts: AlertStore::new(),
            style,
            results_tx,
            results_rx,
            events_tx,
            events_rx,
            events_task: None,
            events_seen: 0,
            pending: 0,
        };
        app.connect(&cc.egui_ctx);
        Ok(app)
    }

    fn visible_cameras(&self) -> Vec<String> {
        match &self.selection {
            CameraSelection::All => self.config.cameras.iter().map(|c| c.id.clone()).collect(),
            CameraSelection::One(id) => vec![id.clone()],
        }
    }

    /// (Re)open feeds and the event stream for the current server and selection.
    fn connect(&mut self, ctx: &egui::Context) {
        let server = self.client.server();
        let cameras = self.visible_cameras();
        self.feeds.open(&server, &self.client, &cameras);
        self.restart_events(ctx, &server);
    }

    fn restart_events(&mut self, ctx: &egui::Context, server: &ServerUrl) {
        if let Some(task) = self.events_task.take() {
            task.abort();
        }
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();
        let retry = self.config.stream.reconnect_delay();
        let server = server.clone();
        self.events_task = Some(self.runtime.spawn(async move {
            loop {
                match client.subscribe_events().await {
                    Ok(mut events) => {
                        info!(server = %server, "Listening for server events");
                        while let Some(event) = events.next().await {
                            if tx.send(event).is_err() {
                                return;
                            }
                            ctx.request_repaint();
                        }
                    }
                    Err(e) => warn!(server = %server, error = %e, "Event stream unavailable"),
                }
                tokio::time::sleep(retry).await;
            }
        }));
    }

    fn run(&mut self, ctx: &egui::Context, command: Command) {
        self.pending += 1;
        self.control_bar.busy = true;
        let ctx = ctx.clone();
        control::dispatch(
            &self.runtime,
            self.client.clone(),
            command,
            self.results_tx.clone(),
            move || ctx.request_repaint(),
        );
    }

    fn handle_control(&mut self, ctx: &egui::Context, action: ControlAction) {
        match action {
            ControlAction::Select(selection) => {
                self.selection = selection;
                self.control_bar.recording = false;
                self.connect(ctx);
            }
            ControlAction::SetServer(raw) => match self.client.set_server(&raw) {
                Ok(true) => {
                    let server = self.client.server();
                    self.control_bar.server_input = server.to_string();
                    self.alerts.push_message(format!("Server set to {server}"));
                    self.connect(ctx);
                }
                Ok(false) => {
                    self.control_bar.server_input = self.client.server().to_string();
                }
                Err(e) => {
                    self.alerts
                        .push(Alert::new(e.to_string()).with_level(AlertLevel::Error));
                }
            },
            ControlAction::OpenCalibration => {
                let camera = match &self.selection {
                    CameraSelection::One(id) => id.clone(),
                    CameraSelection::All => self
                        .config
                        .cameras
                        .first()
                        .map(|c| c.id.clone())
                        .unwrap_or_default(),
                };
                self.calibration = Some(CalibrationState::new(camera));
            }
            other => self.run(ctx, Command::Control(other)),
        }
    }

    fn drain_channels(&mut self) {
        for outcome in self.results_rx.try_iter() {
            self.pending = self.pending.saturating_sub(1);
            let level = if outcome.result.is_ok() {
                AlertLevel::Info
            } else {
                AlertLevel::Error
            };
            self.alerts
                .push(Alert::new(outcome.message()).with_level(level));
            if let (Some(form), Err(e)) = (&mut self.calibration, &outcome.result) {
                if outcome.label.starts_with("Calibration") {
                    form.error = Some(e.to_string());
                }
            }
        }
        self.control_bar.busy = self.pending > 0;

        for event in self.events_rx.try_iter() {
            self.events_seen += 1;
            if let Some(message) = control::event_alert(&event) {
                self.alerts
                    .push(Alert::new(message).with_level(AlertLevel::Warning));
            }
        }
    }

    fn show_tiles(&mut self, ui: &mut egui::Ui) -> Vec<TileAction> {
        let mut actions = Vec::new();
        let count = self.feeds.views().len();
        if count == 0 {
            ui.centered_and_justified(|ui| ui.label("No cameras configured"));
            return actions;
        }
        let columns = if count == 1 { 1 } else { 2 };
        let rows = count.div_ceil(columns);
        let gap = Theme::SPACE_SM;
        let avail = ui.available_size();
        let tile_size = egui::vec2(
            (avail.x - gap * (columns as f32 - 1.0)) / columns as f32,
            (avail.y - gap * (rows as f32 - 1.0)) / rows as f32,
        );
        let origin = ui.available_rect_before_wrap().min;
        let style = self.style;
        let names: Vec<String> = self
            .feeds
            .views()
            .iter()
            .map(|v| {
                self.config
                    .cameras
                    .iter()
                    .find(|c| c.id == v.camera_id())
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_else(|| v.camera_id().to_string())
            })
            .collect();

        for (i, view) in self.feeds.views_mut().iter_mut().enumerate() {
            let col = (i % columns) as f32;
            let row = (i / columns) as f32;
            let min = origin + egui::vec2(col * (tile_size.x + gap), row * (tile_size.y + gap));
            let rect = egui::Rect::from_min_size(min, tile_size);

            let snapshot = view.feed.snapshot();
            let (render_view, frame_size) = {
                let session = view.feed.session().lock();
                (session.view(), session.frame_info().size())
            };
            let input = TileInput {
                title: &names[i],
                view: render_view,
                stream_frame: view.stream_frame(),
                snapshot: &snapshot,
                frame_size,
                status: view.feed.status(),
                style,
            };
            let mut child = ui.new_child(egui::UiBuilder::new().max_rect(rect));
            actions.extend(view.tile.show(&mut child, input));
        }
        actions
    }
}

impl eframe::App for DistroTrackApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_channels();

        let mut control_actions = Vec::new();
        egui::TopBottomPanel::top("control_bar")
            .frame(Theme::panel_frame())
            .show(ctx, |ui| {
                control_actions = show_control_bar(
                    ui,
                    &mut self.control_bar,
                    &self.config.cameras,
                    &self.selection,
                );
            });

        egui::TopBottomPanel::bottom("status_bar")
            .frame(Theme::panel_frame())
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!("Server {}", self.client.server()))
                            .size(Theme::FONT_XS)
                            .color(Theme::t3()),
                    );
                    ui.separator();
                    ui.label(
                        egui::RichText::new(format!("{} events", self.events_seen))
                            .size(Theme::FONT_XS)
                            .color(Theme::t3()),
                    );
                    if self.pending > 0 {
                        ui.separator();
                        ui.spinner();
                    }
                });
            });

        if let CameraSelection::One(camera) = &self.selection {
            let camera = camera.clone();
            let cards: Vec<HistoryCard> = self
                .feeds
                .views()
                .first()
                .map(|v| v.feed.snapshot().iter().map(HistoryCard::from_track).collect())
                .unwrap_or_default();
            egui::SidePanel::right("history_panel")
                .resizable(true)
                .default_width(300.0)
                .frame(Theme::panel_frame())
                .show(ctx, |ui| show_history_panel(ui, &camera, &cards));
        }

        let tile_actions = egui::CentralPanel::default()
            .show(ctx, |ui| self.show_tiles(ui))
            .inner;

        for action in tile_actions {
            let TileAction::Focus(id) = action;
            if self.selection == CameraSelection::All {
                control_actions.push(ControlAction::Select(CameraSelection::One(id)));
            }
        }
        for action in control_actions {
            self.handle_control(ctx, action);
        }

        if let Some(form) = &mut self.calibration {
            let cameras: Vec<String> = self.config.cameras.iter().map(|c| c.id.clone()).collect();
            let mut close = false;
            let mut submit = None;
            for action in show_calibration(ctx, form, &cameras) {
                match action {
                    CalibrationAction::Submit(request) => submit = Some(request),
                    CalibrationAction::Close => close = true,
                }
            }
            if close {
                self.calibration = None;
            }
            if let Some(request) = submit {
                self.run(ctx, Command::Homography(request));
            }
        }

        show_alert_toast(ctx, &mut self.alerts, Instant::now());
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let state = PersistedState {
            server: Some(self.client.server().to_string()),
            selection: self.selection.clone(),
        };
        eframe::set_value(storage, STATE_KEY, &state);
    }
}

impl Drop for DistroTrackApp {
    fn drop(&mut self) {
        if let Some(task) = self.events_task.take() {
            task.abort();
        }
        self.feeds.close_all();
    }
}
