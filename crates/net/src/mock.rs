//! In-memory transport and fake clock for engine tests

use std::time::Duration;

use crate::error::Result;
use crate::transport::{ConnectionId, Scheduler, TimerId, Transport};

/// Records every socket operation instead of performing it
#[derive(Debug, Default)]
pub struct MockTransport {
    next_id: u64,
    pub opened: Vec<(ConnectionId, String)>,
    pub sent: Vec<(ConnectionId, String)>,
    pub closed: Vec<ConnectionId>,
}

impl MockTransport {
    /// Frames written to a given socket
    pub fn sent_on(&self, id: ConnectionId) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(conn, _)| *conn == id)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    pub fn last_opened(&self) -> Option<ConnectionId> {
        self.opened.last().map(|(id, _)| *id)
    }
}

impl Transport for MockTransport {
    fn open(&mut self, url: &str) -> ConnectionId {
        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.opened.push((id, url.to_string()));
        id
    }

    fn send(&mut self, id: ConnectionId, text: String) -> Result<()> {
        self.sent.push((id, text));
        Ok(())
    }

    fn close(&mut self, id: ConnectionId) {
        self.closed.push(id);
    }
}

/// Manually advanced clock
#[derive(Debug, Default)]
pub struct MockScheduler {
    now: Duration,
    next_id: u64,
    pending: Vec<(TimerId, Duration)>,
    pub cancelled: Vec<TimerId>,
}

impl MockScheduler {
    /// Move the clock forward and return the timers that expired, earliest first
    pub fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        self.now += by;
        let now = self.now;
        let mut due: Vec<(TimerId, Duration)> = Vec::new();
        self.pending.retain(|timer| {
            if timer.1 <= now {
                due.push(*timer);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(id, at)| (*at, id.0));
        due.into_iter().map(|(id, _)| id).collect()
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Scheduler for MockScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push((id, self.now + delay));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        let before = self.pending.len();
        self.pending.retain(|(timer, _)| *timer != id);
        if self.pending.len() != before {
            self.cancelled.push(id);
        }
    }
}
