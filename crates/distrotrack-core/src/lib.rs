//! DistroTrack Core - client-side model of a multi-camera tracking system
//!
//! This crate holds everything that does not touch the network or a window:
//! - Wire messages from the per-camera frame/track socket
//! - Track aggregation with bounded history and stale eviction
//! - Frame renderers (continuous stream vs. discrete stills)
//! - Overlay projection from frame space to viewport space
//! - Connection state machine, alert queue, configuration

pub mod aggregator;
pub mod alerts;
pub mod config;
pub mod connection;
pub mod error;
pub mod geometry;
pub mod history;
pub mod message;
pub mod mjpeg;
pub mod overlay;
pub mod render;
pub mod session;
pub mod sse;
pub mod track;

pub use aggregator::{FrameInfo, IngestReport, TrackAggregator, TrackSnapshot};
pub use alerts::{Alert, AlertLevel, AlertStore};
pub use config::{ClientConfig, RenderMode, ServerUrl};
pub use connection::{ConnectionEvent, ConnectionMachine, ConnectionState};
pub use error::{DistroError, Result};
pub use geometry::{BBox, Point, Size};
pub use history::HistoryCard;
pub use message::{Detection, FrameMessage};
pub use overlay::{OverlayCache, OverlayStyle, Polyline};
pub use render::{EncodedFrame, FitMode, FrameRenderer, RenderView};
pub use session::CameraSession;
pub use track::{History, Sample, Space, Track};
