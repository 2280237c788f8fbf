//! Per-camera streaming socket with automatic reconnect.
//!
//! A [`CameraFeed`] owns one background task per camera. The task connects,
//! applies every text message to the camera's [`CameraSession`], and on close
//! waits a fixed delay before trying again, until the [`FeedHandle`] is closed
//! or dropped.

use crate::error::{NetError, Result};
use distrotrack_core::session::MessageOutcome;
use distrotrack_core::{
    CameraSession, ConnectionEvent, ConnectionMachine, ConnectionState, ServerUrl, TrackSnapshot,
};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Text payloads of one open socket. The stream ends when the socket closes;
/// an `Err` item means the socket failed.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Camera session shared between the socket task and readers.
pub type SharedSession = Arc<Mutex<CameraSession>>;

/// Called (with the session locked) after each applied message.
pub type UpdateCallback = Arc<dyn Fn(&str, &MessageOutcome) + Send + Sync>;

/// Opens sockets. Swappable so the reconnect loop can run against scripted
/// connections.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<TextStream>>;
}

/// Production connector backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<TextStream>> {
        let url = url.to_string();
        Box::pin(async move {
            let (socket, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
            let texts = socket.filter_map(|msg| {
                futures::future::ready(match msg {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(NetError::from(e))),
                })
            });
            Ok(texts.boxed())
        })
    }
}

/// Builder for one camera's socket task.
pub struct CameraFeed {
    camera_id: String,
    url: String,
    session: SharedSession,
    retry_delay: Duration,
    connector: Arc<dyn Connector>,
    on_update: Option<UpdateCallback>,
}

impl CameraFeed {
    /// Feed for `<server as ws>/ws/<camera id>`.
    pub fn new(server: &ServerUrl, session: CameraSession, retry_delay: Duration) -> Self {
        let url = server.ws_url(session.camera_id());
        Self::with_url(url, session, retry_delay)
    }

    pub fn with_url(url: impl Into<String>, session: CameraSession, retry_delay: Duration) -> Self {
        Self {
            camera_id: session.camera_id().to_string(),
            url: url.into(),
            session: Arc::new(Mutex::new(session)),
            retry_delay,
            connector: Arc::new(TungsteniteConnector),
            on_update: None,
        }
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn on_update(mut self, callback: UpdateCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    /// Start the socket task on the current tokio runtime.
    pub fn spawn(self) -> FeedHandle {
        self.spawn_on(&Handle::current())
    }

    pub fn spawn_on(self, runtime: &Handle) -> FeedHandle {
        let machine = Arc::new(Mutex::new(ConnectionMachine::new(self.retry_delay)));
        let (status_tx, status_rx) = watch::channel(ConnectionState::Connecting);
        let cancel = CancellationToken::new();

        let task = FeedTask {
            camera_id: self.camera_id.clone(),
            url: self.url,
            session: Arc::clone(&self.session),
            machine: Arc::clone(&machine),
            status: status_tx,
            retry_delay: self.retry_delay,
            connector: self.connector,
            on_update: self.on_update,
        };
        let token = cancel.clone();
        let join = runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = task.run() => {}
            }
        });

        FeedHandle {
            camera_id: self.camera_id,
            session: self.session,
            machine,
            status: status_rx,
            cancel,
            task: Some(join),
        }
    }
}

/// Owner of a running feed. Closing (or dropping) it stops the task and
/// clears the camera's track state.
pub struct FeedHandle {
    camera_id: String,
    session: SharedSession,
    machine: Arc<Mutex<ConnectionMachine>>,
    status: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn status(&self) -> ConnectionState {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status.clone()
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        self.session.lock().snapshot()
    }

    /// Connection attempts made so far.
    pub fn attempts(&self) -> u64 {
        self.machine.lock().attempts()
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }

    /// Stop the feed. Once this returns no status change, reconnect or track
    /// update will be observed.
    pub fn close(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.machine.lock().handle(ConnectionEvent::Teardown);
        self.cancel.cancel();
        task.abort();
        self.session.lock().teardown();
        debug!(camera = %self.camera_id, "Feed closed");
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

struct FeedTask {
    camera_id: String,
    url: String,
    session: SharedSession,
    machine: Arc<Mutex<ConnectionMachine>>,
    status: watch::Sender<ConnectionState>,
    retry_delay: Duration,
    connector: Arc<dyn Connector>,
    on_update: Option<UpdateCallback>,
}

impl FeedTask {
    /// Feed an event to the machine and publish the resulting state while
    /// still holding the machine lock. `None` once torn down.
    fn step(&self, event: ConnectionEvent) -> Option<Option<Duration>> {
        let mut machine = self.machine.lock();
        let step = machine.handle(event)?;
        self.status.send_replace(step.state);
        Some(step.retry_after)
    }

    fn apply(&self, text: &str) {
        let mut session = self.session.lock();
        if let Some(outcome) = session.handle_text(text) {
            trace!(
                camera = %self.camera_id,
                created = outcome.tracks.created,
                evicted = outcome.tracks.evicted,
                "Applied message"
            );
            if let Some(callback) = &self.on_update {
                callback(&self.camera_id, &outcome);
            }
        }
    }

    async fn run(self) {
        loop {
            if self.step(ConnectionEvent::Connect).is_none() {
                return;
            }
            debug!(camera = %self.camera_id, url = %self.url, "Connecting");

            match self.connector.connect(&self.url).await {
                Ok(mut stream) => {
                    if self.step(ConnectionEvent::Opened).is_none() {
                        return;
                    }
                    info!(camera = %self.camera_id, "Socket connected");
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(text) => self.apply(&text),
                            Err(e) => {
                                warn!(camera = %self.camera_id, error = %e, "Socket error");
                                if self.step(ConnectionEvent::Failed).is_none() {
                                    return;
                                }
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(camera = %self.camera_id, url = %self.url, error = %e, "Connect failed");
                    if self.step(ConnectionEvent::Failed).is_none() {
                        return;
                    }
                }
            }

            let Some(retry_after) = self.step(ConnectionEvent::Closed) else {
                return;
            };
            let delay = retry_after.unwrap_or(self.retry_delay);
            debug!(camera = %self.camera_id, delay_ms = delay.as_millis() as u64, "Reconnecting");
            tokio::time::sleep(delay).await;
        }
    }
}
