//! DistroTrack - multi-camera tracking client
//!
//! Entry point: parses the command line, loads configuration and either opens
//! the window or runs one of the terminal commands.

mod app;
mod control;
mod feeds;
mod headless;

use anyhow::{Context, Result};
use app::DistroTrackApp;
use clap::{Parser, Subcommand, ValueEnum};
use distrotrack_core::{ClientConfig, RenderMode, ServerUrl};
use eframe::egui;
use headless::CtlCommand;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "distrotrack.toml";

#[derive(Parser, Debug)]
#[command(name = "distrotrack", version, about = "Multi-camera tracking client")]
struct Cli {
    /// Config file (default: ./distrotrack.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tracking server base URL, overrides the config file
    #[arg(short, long)]
    server: Option<String>,

    #[arg(long, value_enum)]
    render_mode: Option<RenderArg>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Open the viewer window (default)
    View,
    /// Print one camera's movement history periodically
    Watch {
        camera: String,
        /// Seconds between prints
        #[arg(long, default_value_t = 2.0)]
        interval: f64,
    },
    /// Send a control request
    Ctl {
        #[command(subcommand)]
        command: CtlCommand,
    },
    /// Print server events as JSON lines
    Events,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum RenderArg {
    Discrete,
    Stream,
}

impl From<RenderArg> for RenderMode {
    fn from(arg: RenderArg) -> Self {
        match arg {
            RenderArg::Discrete => RenderMode::Discrete,
            RenderArg::Stream => RenderMode::Stream,
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let local = PathBuf::from(CONFIG_FILE);
            let user = dirs::config_dir().map(|d| d.join("distrotrack").join(CONFIG_FILE));
            match user {
                Some(user) if !local.exists() => ClientConfig::load_or_default(user),
                _ => ClientConfig::load_or_default(local),
            }
        }
    };
    if let Some(server) = &cli.server {
        config.server = ServerUrl::parse(server)
            .with_context(|| format!("invalid --server {server:?}"))?
            .to_string();
    }
    if let Some(mode) = cli.render_mode {
        config.stream.render_mode = mode.into();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("distrotrack-io")
        .build()
        .context("starting async runtime")?;

    match cli.command.unwrap_or(Mode::View) {
        Mode::Watch { camera, interval } => {
            let every = Duration::try_from_secs_f64(interval)
                .ok()
                .filter(|d| !d.is_zero())
                .context("--interval must be a positive number of seconds")?;
            runtime.block_on(headless::watch(&config, &camera, every))
        }
        Mode::Ctl { command } => runtime.block_on(headless::ctl(&config, command)),
        Mode::Events => runtime.block_on(headless::events(&config)),
        Mode::View => {
            info!(server = %config.server, cameras = config.cameras.len(), "DistroTrack starting");
            let _guard = runtime.enter();
            let handle = runtime.handle().clone();
            let pinned_server = cli.server.is_some();

            let options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([1280.0, 800.0])
                    .with_min_inner_size([640.0, 400.0])
                    .with_title("DistroTrack"),
                renderer: eframe::Renderer::Wgpu,
                ..Default::default()
            };
            eframe::run_native(
                "DistroTrack",
                options,
                Box::new(move |cc| {
                    let app = DistroTrackApp::new(cc, handle, config, pinned_server)?;
                    Ok(Box::new(app))
                }),
            )
            .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
        }
    }
}
