//! Per-object trajectory records.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Coordinate space a sample position is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    /// Floor-plane coordinates from the server's homography.
    World,
    /// Source-image pixels (bounding-box foot point).
    Image,
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::World => write!(f, "world"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// One observation of a tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds, server clock.
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub space: Space,
    /// Foot point in source-image pixels, whatever `space` is.
    pub image: Point,
}

impl Sample {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Bounded, chronologically ordered sample history. Oldest samples are
/// evicted first once `capacity` is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample. A timestamp earlier than the newest stored sample is
    /// raised to it so the history never goes backwards in time.
    pub fn push(&mut self, mut sample: Sample) {
        if let Some(last) = self.samples.back() {
            if sample.t < last.t {
                sample.t = last.t;
            }
        }
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// The `n` newest samples, newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Sample> {
        self.samples.iter().rev().take(n)
    }
}

/// Live record for one global id on one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub global_id: i64,
    /// Local tracker id of the most recent detection.
    pub local_id: Option<i64>,
    pub confidence: Option<f64>,
    /// Whether the most recent position came from world coordinates.
    pub world: bool,
    pub last: Sample,
    pub history: History,
}

impl Track {
    pub(crate) fn new(global_id: i64, first: Sample, capacity: usize) -> Self {
        let mut history = History::new(capacity);
        history.push(first);
        Self {
            global_id,
            local_id: None,
            confidence: None,
            world: first.space == Space::World,
            last: first,
            history,
        }
    }

    pub(crate) fn record(&mut self, sample: Sample) {
        self.history.push(sample);
        if let Some(stored) = self.history.last() {
            self.last = *stored;
        }
        self.world = sample.space == Space::World;
    }

    /// Seconds since the last sample, relative to `now`.
    pub fn idle_for(&self, now: f64) -> f64 {
        now - self.last.t
    }
}
