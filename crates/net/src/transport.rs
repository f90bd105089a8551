//! Transport and timer seams
//!
//! The connection engine is synchronous. It asks a [`Transport`] to open and
//! write sockets and a [`Scheduler`] to arm timers; both report back later by
//! delivering [`ConnectionEvent`]s, in order, to the single task that owns the
//! engine.

use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Handle of one socket opened by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle of one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Callback delivered to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket finished opening
    Opened(ConnectionId),
    /// A text frame arrived; non-text frames are never delivered
    Message(ConnectionId, String),
    /// The socket closed, normally or not. Delivered once per socket.
    Closed(ConnectionId),
    /// The socket failed; a `Closed` follows once it is torn down
    Error(ConnectionId, String),
    /// A timer armed through [`Scheduler::schedule`] expired
    TimerFired(TimerId),
}

/// Socket operations
pub trait Transport {
    /// Start opening a socket. The handle is valid immediately; `Opened` or
    /// `Error` + `Closed` follow.
    fn open(&mut self, url: &str) -> ConnectionId;

    /// Write a text frame
    fn send(&mut self, id: ConnectionId, text: String) -> Result<()>;

    /// Close a socket. Closing an unknown or already closed socket is a no-op.
    fn close(&mut self, id: ConnectionId);
}

/// Deferred callbacks
pub trait Scheduler {
    /// Arm a one-shot timer
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Disarm a timer; cancelling a fired or unknown timer is a no-op
    fn cancel(&mut self, id: TimerId);
}
