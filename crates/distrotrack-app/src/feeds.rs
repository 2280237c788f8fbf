//! The set of camera feeds currently on screen.
//!
//! Switching cameras or servers tears every feed down (closing its socket and
//! clearing its tracks) before the new ones are opened.

use distrotrack_core::geometry::Size;
use distrotrack_core::message::now_secs;
use distrotrack_core::render::renderer_for;
use distrotrack_core::{CameraSession, ClientConfig, EncodedFrame, RenderMode, ServerUrl};
use distrotrack_net::{CameraFeed, CommandClient, FeedHandle};
use distrotrack_ui::CameraTile;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

type LatestFrame = Arc<Mutex<Option<Arc<EncodedFrame>>>>;

/// Background MJPEG reader keeping only the newest image.
struct MjpegReader {
    latest: LatestFrame,
    task: JoinHandle<()>,
}

impl Drop for MjpegReader {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct CameraView {
    pub feed: FeedHandle,
    pub tile: CameraTile,
    mjpeg: Option<MjpegReader>,
}

impl CameraView {
    pub fn camera_id(&self) -> &str {
        self.feed.camera_id()
    }

    pub fn stream_frame(&self) -> Option<Arc<EncodedFrame>> {
        self.mjpeg.as_ref().and_then(|m| m.latest.lock().clone())
    }
}

pub struct FeedSet {
    runtime: Handle,
    config: ClientConfig,
    repaint: egui::Context,
    views: Vec<CameraView>,
}

impl FeedSet {
    pub fn new(runtime: Handle, config: ClientConfig, repaint: egui::Context) -> Self {
        Self {
            runtime,
            config,
            repaint,
            views: Vec::new(),
        }
    }

    pub fn views(&self) -> &[CameraView] {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut [CameraView] {
        &mut self.views
    }

    /// Close every feed, then open one per id in `camera_ids`.
    pub fn open(&mut self, server: &ServerUrl, client: &CommandClient, camera_ids: &[String]) {
        self.close_all();
        info!(server = %server, cameras = ?camera_ids, "Opening feeds");
        for id in camera_ids {
            let view = self.open_one(server, client, id);
            self.views.push(view);
        }
    }

    fn open_one(&self, server: &ServerUrl, client: &CommandClient, camera_id: &str) -> CameraView {
        let stream = &self.config.stream;
        let renderer = renderer_for(stream.render_mode, server, camera_id, stream.frame_interval());
        let session = CameraSession::new(camera_id, self.config.tracking.clone(), renderer);
        let ctx = self.repaint.clone();
        let feed = CameraFeed::new(server, session, stream.reconnect_delay())
            .on_update(Arc::new(move |_, _| ctx.request_repaint()))
            .spawn_on(&self.runtime);

        let mjpeg = (stream.render_mode == RenderMode::Stream)
            .then(|| self.spawn_mjpeg(client.clone(), camera_id.to_string()));

        CameraView {
            feed,
            tile: CameraTile::new(camera_id),
            mjpeg,
        }
    }

    fn spawn_mjpeg(&self, client: CommandClient, camera_id: String) -> MjpegReader {
        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&latest);
        let ctx = self.repaint.clone();
        let retry = self.config.stream.reconnect_delay();
        let task = self.runtime.spawn(async move {
            let mut seq = 0u64;
            loop {
                match client.subscribe_mjpeg(&camera_id).await {
                    Ok(mut frames) => {
                        while let Some(jpeg) = frames.next().await {
                            seq += 1;
                            *slot.lock() = Some(Arc::new(EncodedFrame {
                                seq,
                                jpeg,
                                size: Size::ZERO,
                                timestamp: now_secs(),
                            }));
                            ctx.request_repaint();
                        }
                    }
                    Err(e) => warn!(camera = %camera_id, error = %e, "MJPEG stream unavailable"),
                }
                tokio::time::sleep(retry).await;
            }
        });
        MjpegReader { latest, task }
    }

    pub fn close_all(&mut self) {
        for mut view in self.views.drain(..) {
            view.feed.close();
        }
    }
}

impl Drop for FeedSet {
    fn drop(&mut self) {
        self.close_all();
    }
}
