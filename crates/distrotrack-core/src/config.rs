//! Client configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! (or missing) file yields a working setup pointed at the default server.
//!
//! ```toml
//! server = "http://192.168.1.50:8000"
//!
//! [[cameras]]
//! id = "cam1"
//! name = "Front Door"
//!
//! [tracking]
//! history_cap = 50
//! stale_after_secs = 30.0
//!
//! [stream]
//! reconnect_delay_ms = 1200
//! frame_interval_ms = 50
//! render_mode = "discrete"
//! ```

use crate::error::{DistroError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the tracking server.
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_cameras")]
    pub cameras: Vec<CameraConfig>,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl CameraConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Samples kept per track.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Tracks idle longer than this (relative to the newest message) are dropped.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: f64,
}

/// How full frames are delivered to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Base64 stills carried on the tracking socket, throttled.
    #[default]
    Discrete,
    /// Multipart JPEG stream from `/stream/<camId>`.
    Stream,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Minimum spacing between displayed stills.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default)]
    pub render_mode: RenderMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// `#rrggbb`
    #[serde(default = "default_overlay_color")]
    pub color: String,
    #[serde(default = "default_overlay_width")]
    pub width: f32,
}

fn default_server() -> String { "http://192.168.1.50:8000".to_string() }
fn default_cameras() -> Vec<CameraConfig> {
    (1..=4).map(|i| CameraConfig::new(format!("cam{i}"))).collect()
}
fn default_history_cap() -> usize { 50 }
fn default_stale_after() -> f64 { 30.0 }
fn default_reconnect_delay_ms() -> u64 { 1200 }
fn default_frame_interval_ms() -> u64 { 50 }
fn default_request_timeout_ms() -> u64 { 8000 }
fn default_overlay_color() -> String { "#3b82f6".to_string() }
fn default_overlay_width() -> f32 { 3.0 }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            cameras: default_cameras(),
            tracking: TrackingConfig::default(),
            stream: StreamConfig::default(),
            api: ApiConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            stale_after_secs: default_stale_after(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            render_mode: RenderMode::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            color: default_overlay_color(),
            width: default_overlay_width(),
        }
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl OverlayConfig {
    /// Parse `color` into RGB bytes.
    pub fn rgb(&self) -> Result<[u8; 3]> {
        let hex = self.color.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(DistroError::Config(format!(
                "overlay color must be #rrggbb, got {:?}",
                self.color
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| DistroError::Config(format!("overlay color {:?}: {e}", self.color)))
        };
        Ok([channel(0)?, channel(2)?, channel(4)?])
    }
}

impl ClientConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists and parses; otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        ServerUrl::parse(&self.server)?;
        if self.tracking.history_cap == 0 {
            return Err(DistroError::Config("tracking.history_cap must be > 0".into()));
        }
        let stale = self.tracking.stale_after_secs;
        if stale.is_nan() || stale <= 0.0 {
            return Err(DistroError::Config(
                "tracking.stale_after_secs must be > 0".into(),
            ));
        }
        if self.stream.reconnect_delay_ms == 0 {
            return Err(DistroError::Config(
                "stream.reconnect_delay_ms must be > 0".into(),
            ));
        }
        if self.stream.frame_interval_ms == 0 {
            return Err(DistroError::Config(
                "stream.frame_interval_ms must be > 0".into(),
            ));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(DistroError::Config("api.request_timeout_ms must be > 0".into()));
        }
        if let Some(cam) = self.cameras.iter().find(|c| c.id.trim().is_empty()) {
            return Err(DistroError::Config(format!("camera with empty id: {cam:?}")));
        }
        self.overlay.rgb()?;
        Ok(())
    }

    pub fn server_url(&self) -> Result<ServerUrl> {
        ServerUrl::parse(&self.server)
    }
}

/// Normalized server base URL (scheme + authority, no trailing slash).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerUrl(String);

impl ServerUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        let lower = trimmed.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(DistroError::InvalidParameter(format!(
                "server URL must start with http:// or https://, got {raw:?}"
            )));
        }
        let scheme_len = if lower.starts_with("https://") { 8 } else { 7 };
        if trimmed[scheme_len..].is_empty() {
            return Err(DistroError::InvalidParameter(format!(
                "server URL has no host: {raw:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Replace the URL at runtime. Blank input keeps the current value.
    /// Returns whether the URL changed.
    pub fn update(&mut self, raw: &str) -> Result<bool> {
        if raw.trim().trim_end_matches('/').is_empty() {
            return Ok(false);
        }
        let next = Self::parse(raw)?;
        let changed = next != *self;
        *self = next;
        Ok(changed)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `http` → `ws`, `https` → `wss`.
    pub fn ws_base(&self) -> String {
        // Scheme check in parse() guarantees the prefix is ASCII "http".
        format!("ws{}", &self.0[4..])
    }

    pub fn ws_url(&self, camera_id: &str) -> String {
        format!("{}/ws/{}", self.ws_base(), camera_id)
    }

    pub fn stream_url(&self, camera_id: &str) -> String {
        format!("{}/stream/{}", self.0, camera_id)
    }
}

impl std::fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.tracking.history_cap, 50);
        assert_eq!(config.stream.reconnect_delay(), Duration::from_millis(1200));
        assert_eq!(config.api.request_timeout(), Duration::from_secs(8));
        assert_eq!(config.cameras.len(), 4);
        assert_eq!(config.overlay.rgb().unwrap(), [0x3b, 0x82, 0xf6]);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            server = "https://example.org/"
            [stream]
            render_mode = "stream"
            [tracking]
            stale_after_secs = 10.0
            "#,
        )
        .unwrap();
        assert_eq!(config.stream.render_mode, RenderMode::Stream);
        assert_eq!(config.stream.frame_interval_ms, 50);
        assert_eq!(config.tracking.history_cap, 50);
        assert_eq!(config.tracking.stale_after_secs, 10.0);
        assert_eq!(config.server_url().unwrap().as_str(), "https://example.org");
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut config = ClientConfig::default();
        config.tracking.history_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = ClientConfig::default();
        config.stream.frame_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.stream.reconnect_delay_ms = 0;
        assert!(config.validate().is_err());

        let config: std::result::Result<ClientConfig, _> =
            toml::from_str("[stream]\nframe_interval_ms = 0\n");
        assert!(config.unwrap().validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_or_default(dir.path().join("nope.toml"));
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distrotrack.toml");
        fs::write(&path, "[[cameras]]\nid = \"lobby\"\nname = \"Lobby\"\n").unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.cameras.len(), 1);
        assert_eq!(config.cameras[0].display_name(), "Lobby");
    }

    #[test]
    fn test_server_urls() {
        let url = ServerUrl::parse("HTTP://10.0.0.2:8000///").unwrap();
        assert_eq!(url.as_str(), "HTTP://10.0.0.2:8000");
        assert_eq!(url.ws_url("cam1"), "ws://10.0.0.2:8000/ws/cam1");
        assert_eq!(url.stream_url("cam1"), "HTTP://10.0.0.2:8000/stream/cam1");

        let secure = ServerUrl::parse("https://cams.local").unwrap();
        assert_eq!(secure.ws_url("c"), "wss://cams.local/ws/c");
    }

    #[test]
    fn test_server_url_update_keeps_previous_on_blank() {
        let mut url = ServerUrl::parse("http://a:1").unwrap();
        assert!(!url.update("  ").unwrap());
        assert_eq!(url.as_str(), "http://a:1");
        assert!(url.update("http://b:2/").unwrap());
        assert_eq!(url.as_str(), "http://b:2");
        assert!(url.update("ftp://c").is_err());
        assert_eq!(url.as_str(), "http://b:2");
    }

    #[test]
    fn test_server_url_requires_host() {
        assert!(ServerUrl::parse("http://").is_err());
        assert!(ServerUrl::parse("https:///").is_err());
    }
}
