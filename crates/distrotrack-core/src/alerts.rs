//! User-facing alert queue.
//!
//! One alert is shown at a time; later ones wait in FIFO order. The store is
//! an ordinary value owned by whoever displays alerts and handed to the views
//! that raise them.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const DEFAULT_ALERT_DURATION: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub message: String,
    pub level: AlertLevel,
    pub duration: Duration,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            level: AlertLevel::Info,
            duration: DEFAULT_ALERT_DURATION,
        }
    }

    pub fn with_level(mut self, level: AlertLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

#[derive(Debug, Default)]
pub struct AlertStore {
    current: Option<(Alert, Option<Instant>)>,
    queue: VecDeque<Alert>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `alert` now if nothing is displayed, otherwise queue it.
    pub fn push(&mut self, alert: Alert) -> Uuid {
        let id = alert.id;
        if self.current.is_none() {
            self.current = Some((alert, None));
        } else {
            self.queue.push_back(alert);
        }
        id
    }

    pub fn push_message(&mut self, message: impl Into<String>) -> Uuid {
        self.push(Alert::new(message))
    }

    /// Dismiss the current alert and promote the next queued one.
    pub fn pop(&mut self) -> Option<Alert> {
        let previous = self.current.take().map(|(alert, _)| alert);
        self.current = self.queue.pop_front().map(|alert| (alert, None));
        previous
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.queue.clear();
    }

    pub fn current(&self) -> Option<&Alert> {
        self.current.as_ref().map(|(alert, _)| alert)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Advance the display clock. The current alert's timer starts the first
    /// time it is observed here; once its duration has elapsed it is popped.
    /// Returns the expired alert, if any.
    pub fn expire(&mut self, now: Instant) -> Option<Alert> {
        let (alert, shown_at) = self.current.as_mut()?;
        let started = *shown_at.get_or_insert(now);
        if now.saturating_duration_since(started) >= alert.duration {
            self.pop()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut store = AlertStore::new();
        store.push_message("first");
        store.push_message("second");
        store.push_message("third");
        assert_eq!(store.current().unwrap().message, "first");
        assert_eq!(store.queued(), 2);

        assert_eq!(store.pop().unwrap().message, "first");
        assert_eq!(store.current().unwrap().message, "second");
        store.pop();
        store.pop();
        assert!(store.current().is_none());
        assert!(store.pop().is_none());
    }

    #[test]
    fn test_clear() {
        let mut store = AlertStore::new();
        store.push_message("a");
        store.push_message("b");
        store.clear();
        assert!(store.current().is_none());
        assert_eq!(store.queued(), 0);
    }

    #[test]
    fn test_ids_unique_and_default_duration() {
        let a = Alert::new("x");
        let b = Alert::new("x");
        assert_ne!(a.id, b.id);
        assert_eq!(a.duration, Duration::from_secs(4));
    }

    #[test]
    fn test_expire_after_duration() {
        let mut store = AlertStore::new();
        store.push(Alert::new("short").with_duration(Duration::from_millis(100)));
        store.push_message("next");
        let t0 = Instant::now();
        assert!(store.expire(t0).is_none());
        assert!(store.expire(t0 + Duration::from_millis(50)).is_none());
        let gone = store.expire(t0 + Duration::from_millis(100)).unwrap();
        assert_eq!(gone.message, "short");
        // The promoted alert's timer starts on its first observation.
        let t1 = t0 + Duration::from_secs(10);
        assert!(store.expire(t1).is_none());
        assert_eq!(store.current().unwrap().message, "next");
    }
}
