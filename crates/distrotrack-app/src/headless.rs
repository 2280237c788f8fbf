//! Terminal commands: follow one camera's tracks, poke the control API, or
//! tail server events.

use anyhow::{Context, Result};
use clap::Subcommand;
use distrotrack_core::render::renderer_for;
use distrotrack_core::{CameraSession, ClientConfig, HistoryCard};
use distrotrack_net::{CameraFeed, CommandClient, Zone};
use futures::StreamExt;
use std::time::Duration;
use tracing::info;

#[derive(Subcommand, Debug, Clone)]
pub enum CtlCommand {
    /// Start one camera
    Start { camera: String },
    /// Stop one camera
    Stop { camera: String },
    /// Toggle recording on one camera
    Record {
        camera: String,
        #[arg(long)]
        off: bool,
    },
    StartAll,
    StopAll,
    RecordAll {
        #[arg(long)]
        off: bool,
    },
    /// List cameras and their state
    Cameras,
    /// List recent alerts
    Alerts,
    /// List zones
    Zones,
    /// Create a zone from a JSON object (must contain "name")
    CreateZone { json: String },
    DeleteZone { name: String },
}

pub async fn ctl(config: &ClientConfig, command: CtlCommand) -> Result<()> {
    let client = CommandClient::from_config(config)?;
    let value = match command {
        CtlCommand::Start { camera } => client.start_camera(&camera).await?,
        CtlCommand::Stop { camera } => client.stop_camera(&camera).await?,
        CtlCommand::Record { camera, off } => client.record_camera(&camera, !off).await?,
        CtlCommand::StartAll => client.start_all().await?,
        CtlCommand::StopAll => client.stop_all().await?,
        CtlCommand::RecordAll { off } => client.record_all(!off).await?,
        CtlCommand::Cameras => client.list_cameras().await?,
        CtlCommand::Alerts => client.list_alerts().await?,
        CtlCommand::Zones => serde_json::to_value(client.list_zones().await?)?,
        CtlCommand::CreateZone { json } => {
            let zone: Zone = serde_json::from_str(&json).context("zone JSON")?;
            client.create_zone(&zone).await?
        }
        CtlCommand::DeleteZone { name } => client.delete_zone(&name).await?,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Print the movement history of `camera` every `every` until Ctrl-C.
pub async fn watch(config: &ClientConfig, camera: &str, every: Duration) -> Result<()> {
    let server = config.server_url()?;
    let renderer = renderer_for(
        config.stream.render_mode,
        &server,
        camera,
        config.stream.frame_interval(),
    );
    let session = CameraSession::new(camera, config.tracking.clone(), renderer);
    let mut feed = CameraFeed::new(&server, session, config.stream.reconnect_delay()).spawn();
    info!(%camera, server = %server, "Watching");

    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let snapshot = feed.snapshot();
                println!("── {camera} [{}] {} track(s)", feed.status(), snapshot.len());
                for track in snapshot.iter() {
                    print_card(&HistoryCard::from_track(track));
                }
            }
        }
    }
    feed.close();
    Ok(())
}

fn print_card(card: &HistoryCard) {
    let confidence = card.confidence.as_deref().unwrap_or("-");
    println!(
        "  {}  local {}  conf {}  {} {}  points {}  last {}",
        card.title,
        card.local_id,
        confidence,
        card.coords_label,
        card.coords,
        card.points,
        card.last_update
    );
    for line in &card.recent {
        println!("      {}  {}", line.time, line.position);
    }
}

/// Print each pushed event as one JSON line until the stream ends or Ctrl-C.
pub async fn events(config: &ClientConfig) -> Result<()> {
    let client = CommandClient::from_config(config)?;
    let mut stream = client.subscribe_events().await?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = stream.next() => match next {
                Some(event) => println!("{event}"),
                None => break,
            },
        }
    }
    Ok(())
}
