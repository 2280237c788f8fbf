//! Integration test crate for DistroTrack.
//!
//! Holds cross-crate tests: socket messages flowing through a camera session
//! into snapshots, overlays and history cards, and live feeds and control
//! requests against in-process servers.

#[cfg(test)]
mod pipeline;

#[cfg(test)]
mod live;
