//! Runs control requests off the UI thread and reports back over a channel.

use crossbeam_channel::Sender;
use distrotrack_net::{CommandClient, HomographyRequest, NetError};
use distrotrack_ui::ControlAction;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// A request the UI wants executed against the server.
#[derive(Debug, Clone)]
pub enum Command {
    Control(ControlAction),
    Homography(HomographyRequest),
}

/// Result of one command, delivered to the UI thread.
#[derive(Debug)]
pub struct Outcome {
    pub label: String,
    pub result: Result<Value, NetError>,
}

impl Outcome {
    /// One-line message for the alert banner.
    pub fn message(&self) -> String {
        match &self.result {
            Ok(value) => match summarize(value) {
                Some(summary) => format!("{}: {}", self.label, summary),
                None => format!("{}: OK", self.label),
            },
            Err(e) => format!("{} failed: {}", self.label, e),
        }
    }
}

fn summarize(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => Some(format!("{} entries", items.len())),
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn label(command: &Command) -> String {
    match command {
        Command::Control(action) => match action {
            ControlAction::StartCamera(id) => format!("Start {id}"),
            ControlAction::StopCamera(id) => format!("Stop {id}"),
            ControlAction::RecordCamera(id, true) => format!("Record {id}"),
            ControlAction::RecordCamera(id, false) => format!("Stop recording {id}"),
            ControlAction::StartAll => "Start all".into(),
            ControlAction::StopAll => "Stop all".into(),
            ControlAction::RecordAll(true) => "Record all".into(),
            ControlAction::RecordAll(false) => "Stop recording all".into(),
            ControlAction::RefreshStatus => "Cameras".into(),
            other => format!("{other:?}"),
        },
        Command::Homography(req) => format!("Calibration {}", req.camera_id),
    }
}

async fn execute(client: &CommandClient, command: Command) -> Result<Value, NetError> {
    match command {
        Command::Control(action) => match action {
            ControlAction::StartCamera(id) => client.start_camera(&id).await,
            ControlAction::StopCamera(id) => client.stop_camera(&id).await,
            ControlAction::RecordCamera(id, enable) => client.record_camera(&id, enable).await,
            ControlAction::StartAll => client.start_all().await,
            ControlAction::StopAll => client.stop_all().await,
            ControlAction::RecordAll(enable) => client.record_all(enable).await,
            ControlAction::RefreshStatus => client.list_cameras().await,
            other => Err(NetError::InvalidParameter(format!(
                "{other:?} is not a server command"
            ))),
        },
        Command::Homography(req) => client
            .submit_homography(&req)
            .await
            .map(|()| Value::String("saved".into())),
    }
}

/// Spawn `command` on `runtime`; the outcome arrives on `results`.
pub fn dispatch(
    runtime: &Handle,
    client: CommandClient,
    command: Command,
    results: Sender<Outcome>,
    on_done: impl Fn() + Send + 'static,
) {
    let label = label(&command);
    runtime.spawn(async move {
        let result = execute(&client, command).await;
        match &result {
            Ok(_) => info!(command = %label, "Command succeeded"),
            Err(e) => warn!(command = %label, error = %e, "Command failed"),
        }
        // Receiver gone means the window closed.
        let _ = results.send(Outcome { label, result });
        on_done();
    });
}

/// Alert text carried by a pushed server event, if any.
pub fn event_alert(event: &Value) -> Option<String> {
    let map = event.as_object()?;
    if let Some(alert) = map.get("alert") {
        return match alert {
            Value::String(s) => Some(s.clone()),
            Value::Object(inner) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
    }
    None
}
