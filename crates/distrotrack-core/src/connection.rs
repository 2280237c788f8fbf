//! Connection status and the reconnect rule, as a pure state machine.
//!
//! The transport drives this with events as the socket opens, fails and
//! closes; the machine answers with the status to publish and whether to
//! schedule a retry. There is exactly one timed rule: a close while the view
//! is live schedules a reconnect after a fixed delay, forever, without
//! backoff. After teardown every event is ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Error,
    Closed,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt is starting (initially or after a retry delay).
    Connect,
    /// The socket handshake completed.
    Opened,
    /// The socket reported an error.
    Failed,
    /// The socket closed (after an error or normally).
    Closed,
    /// The owning view went away.
    Teardown,
}

/// What the transport should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub state: ConnectionState,
    /// Reconnect after this delay.
    pub retry_after: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    alive: bool,
    retry_delay: Duration,
    attempts: u64,
}

impl ConnectionMachine {
    pub fn new(retry_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Connecting,
            alive: true,
            retry_delay,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Connection attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Apply an event. `None` means the machine is torn down and the caller
    /// must not publish anything.
    pub fn handle(&mut self, event: ConnectionEvent) -> Option<Step> {
        if !self.alive {
            return None;
        }
        let retry_after = match event {
            ConnectionEvent::Teardown => {
                self.alive = false;
                return None;
            }
            ConnectionEvent::Connect => {
                self.attempts += 1;
                self.state = ConnectionState::Connecting;
                None
            }
            ConnectionEvent::Opened => {
                self.state = ConnectionState::Connected;
                None
            }
            ConnectionEvent::Failed => {
                self.state = ConnectionState::Error;
                None
            }
            ConnectionEvent::Closed => {
                self.state = ConnectionState::Closed;
                Some(self.retry_delay)
            }
        };
        Some(Step {
            state: self.state,
            retry_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1200);

    #[test]
    fn test_happy_path() {
        let mut m = ConnectionMachine::new(DELAY);
        assert_eq!(m.state(), ConnectionState::Connecting);
        let step = m.handle(ConnectionEvent::Connect).unwrap();
        assert_eq!(step.state, ConnectionState::Connecting);
        let step = m.handle(ConnectionEvent::Opened).unwrap();
        assert_eq!(step.state, ConnectionState::Connected);
        assert_eq!(step.retry_after, None);
    }

    #[test]
    fn test_close_schedules_fixed_retry_forever() {
        let mut m = ConnectionMachine::new(DELAY);
        for _ in 0..100 {
            m.handle(ConnectionEvent::Connect);
            assert_eq!(
                m.handle(ConnectionEvent::Failed).unwrap().state,
                ConnectionState::Error
            );
            let step = m.handle(ConnectionEvent::Closed).unwrap();
            assert_eq!(step.state, ConnectionState::Closed);
            assert_eq!(step.retry_after, Some(DELAY));
        }
        assert_eq!(m.attempts(), 100);
    }

    #[test]
    fn test_teardown_silences_everything() {
        let mut m = ConnectionMachine::new(DELAY);
        m.handle(ConnectionEvent::Connect);
        m.handle(ConnectionEvent::Opened);
        assert_eq!(m.handle(ConnectionEvent::Teardown), None);
        assert!(!m.is_alive());
        assert_eq!(m.handle(ConnectionEvent::Closed), None);
        assert_eq!(m.handle(ConnectionEvent::Connect), None);
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ConnectionState::Error.to_string(), "error");
        assert_eq!(
            serde_json::to_string(&ConnectionState::Connected).unwrap(),
            "\"connected\""
        );
    }
}
