//! REST client for camera control, zones, alerts and calibration.

use crate::error::{NetError, Result};
use distrotrack_core::{ClientConfig, ServerUrl};
use parking_lot::RwLock;
use reqwest::{header, Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Named region on a camera. Fields other than `name` are passed through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, Value>,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Four image points paired with four world points for one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomographyRequest {
    pub camera_id: String,
    pub image_xy: Vec<[f64; 2]>,
    pub world_xy: Vec<[f64; 2]>,
}

impl HomographyRequest {
    pub const POINTS: usize = 4;

    pub fn validate(&self) -> Result<()> {
        if self.camera_id.trim().is_empty() {
            return Err(NetError::InvalidParameter("camera_id is empty".into()));
        }
        for (label, points) in [("image_xy", &self.image_xy), ("world_xy", &self.world_xy)] {
            if points.len() != Self::POINTS {
                return Err(NetError::InvalidParameter(format!(
                    "{label} needs {} points, got {}",
                    Self::POINTS,
                    points.len()
                )));
            }
            if points.iter().flatten().any(|v| !v.is_finite()) {
                return Err(NetError::InvalidParameter(format!(
                    "{label} contains a non-numeric value"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct HomographyResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct Enable {
    enable: bool,
}

/// Cheap to clone; clones share the server URL.
#[derive(Clone)]
pub struct CommandClient {
    http: reqwest::Client,
    /// Long-lived bodies (`/events`, `/stream`); only the connect is bounded.
    streaming: reqwest::Client,
    server: Arc<RwLock<ServerUrl>>,
}

impl CommandClient {
    pub fn new(server: ServerUrl, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let streaming = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            http,
            streaming,
            server: Arc::new(RwLock::new(server)),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.server_url()?, config.api.request_timeout())
    }

    pub fn server(&self) -> ServerUrl {
        self.server.read().clone()
    }

    /// Point the client at another server. Trailing slashes are dropped and
    /// blank input keeps the current URL. Returns whether the URL changed.
    pub fn set_server(&self, raw: &str) -> Result<bool> {
        let changed = self.server.write().update(raw)?;
        if changed {
            info!(server = %self.server.read(), "Server URL changed");
        }
        Ok(changed)
    }

    pub(crate) fn streaming(&self) -> &reqwest::Client {
        &self.streaming
    }

    /// Server URL with `segments` appended, each percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let server = self.server();
        let mut url = Url::parse(server.as_str())
            .map_err(|e| NetError::InvalidParameter(format!("server URL {server}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| NetError::InvalidParameter(format!("server URL {server} has no path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &[&str],
        body: Option<&B>,
    ) -> Result<Value> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "API request");
        let mut req = self
            .http
            .request(method, url.clone())
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.body(serde_json::to_vec(body)?);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "API request failed");
            return Err(NetError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get(&self, path: &[&str]) -> Result<Value> {
        self.request::<()>(Method::GET, path, None).await
    }

    async fn post(&self, path: &[&str]) -> Result<Value> {
        self.request::<()>(Method::POST, path, None).await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &[&str], body: &B) -> Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn start_camera(&self, camera_id: &str) -> Result<Value> {
        self.post(&["api", "cameras", camera_id, "start"]).await
    }

    pub async fn stop_camera(&self, camera_id: &str) -> Result<Value> {
        self.post(&["api", "cameras", camera_id, "stop"]).await
    }

    pub async fn record_camera(&self, camera_id: &str, enable: bool) -> Result<Value> {
        self.post_json(
            &["api", "cameras", camera_id, "record"],
            &Enable { enable },
        )
        .await
    }

    pub async fn start_all(&self) -> Result<Value> {
        self.post(&["api", "cameras", "actions", "start-all"]).await
    }

    pub async fn stop_all(&self) -> Result<Value> {
        self.post(&["api", "cameras", "actions", "stop-all"]).await
    }

    pub async fn record_all(&self, enable: bool) -> Result<Value> {
        self.post_json(&["api", "cameras", "actions", "record-all"], &Enable { enable })
            .await
    }

    pub async fn list_cameras(&self) -> Result<Value> {
        self.get(&["api", "cameras"]).await
    }

    pub async fn list_alerts(&self) -> Result<Value> {
        self.get(&["api", "alerts"]).await
    }

    pub async fn list_zones(&self) -> Result<Vec<Zone>> {
        let value = match self.get(&["api", "zones"]).await? {
            Value::Object(mut map) if map.contains_key("zones") => {
                map.remove("zones").unwrap_or_default()
            }
            other => other,
        };
        Ok(serde_json::from_value(value)?)
    }

    pub async fn create_zone(&self, zone: &Zone) -> Result<Value> {
        if zone.name.trim().is_empty() {
            return Err(NetError::InvalidParameter("zone name is empty".into()));
        }
        self.post_json(&["api", "zones"], zone).await
    }

    pub async fn delete_zone(&self, name: &str) -> Result<Value> {
        self.request::<()>(Method::DELETE, &["api", "zones", name], None)
            .await
    }

    /// Upload a calibration. Malformed input is rejected before any request
    /// is made; a response with `ok: false` becomes [`NetError::Rejected`].
    pub async fn submit_homography(&self, request: &HomographyRequest) -> Result<()> {
        request.validate()?;
        let value = self.post_json(&["api", "homography"], request).await?;
        let response: HomographyResponse = serde_json::from_value(value)?;
        if response.ok {
            info!(camera = %request.camera_id, "Homography saved");
            Ok(())
        } else {
            Err(NetError::Rejected(
                response.error.unwrap_or_else(|| "homography rejected".into()),
            ))
        }
    }
}
