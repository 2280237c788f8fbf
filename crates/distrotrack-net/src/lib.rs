//! DistroTrack Net - everything that talks to the tracking server
//!
//! - Per-camera frame/track sockets with fixed-delay reconnect
//! - Camera control, zones, alerts and calibration over REST
//! - Server-pushed events and MJPEG streams

pub mod api;
pub mod error;
pub mod events;
pub mod transport;

pub use api::{CommandClient, HomographyRequest, Zone};
pub use error::{NetError, Result};
pub use events::{EventStream, JpegStream};
pub use transport::{CameraFeed, Connector, FeedHandle, SharedSession, TungsteniteConnector};
