//! Connection lifecycle
//!
//! One logical connection per session, healed forever: every close schedules
//! exactly one reconnect after [`RECONNECT_DELAY`], with no backoff growth and
//! no retry limit. Errors force-close the socket and leave rescheduling to the
//! close that follows.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{Command, Push};
use crate::transport::{ConnectionEvent, ConnectionId, Scheduler, TimerId, Transport};

/// Fixed delay between a close and the next attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the one live socket of a session
pub struct ConnectionManager<T, S> {
    transport: T,
    scheduler: S,
    url: Option<String>,
    current: Option<ConnectionId>,
    state: ConnectionState,
    handshake: Option<Command>,
    reconnect_timer: Option<TimerId>,
    keepalive: Option<Duration>,
    keepalive_timer: Option<TimerId>,
}

impl<T: Transport, S: Scheduler> ConnectionManager<T, S> {
    pub fn new(transport: T, scheduler: S) -> Self {
        Self {
            transport,
            scheduler,
            url: None,
            current: None,
            state: ConnectionState::Disconnected,
            handshake: None,
            reconnect_timer: None,
            keepalive: None,
            keepalive_timer: None,
        }
    }

    /// Send a ping at this interval while connected
    pub fn with_keepalive(mut self, interval: Option<Duration>) -> Self {
        self.keepalive = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Whether a reconnect attempt is waiting on its timer
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    #[cfg(test)]
    pub(crate) fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Start the connection. `handshake` is sent on every open.
    pub fn connect(&mut self, url: impl Into<String>, handshake: Command) {
        self.url = Some(url.into());
        self.handshake = Some(handshake);
        self.reconnect();
    }

    /// Replace the handshake used by later opens
    pub fn set_handshake(&mut self, handshake: Command) {
        self.handshake = Some(handshake);
    }

    /// Drop the current socket and open a fresh one immediately.
    ///
    /// A pending reconnect timer is cancelled so it cannot open a second
    /// socket later.
    pub fn reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.stop_keepalive();
        if let Some(old) = self.current.take() {
            debug!(conn = %old, "Dropping socket");
            self.transport.close(old);
        }
        self.open();
    }

    /// Write a command to the current socket.
    ///
    /// Commands are never queued: while not connected they are dropped.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        let Some(id) = self.current.filter(|_| self.state == ConnectionState::Connected) else {
            debug!(verb = command.verb(), state = ?self.state, "Dropping command");
            return Ok(());
        };
        let text = command.encode()?;
        self.transport.send(id, text)
    }

    /// Process one transport or timer event.
    ///
    /// Returns the decoded push carried by a message, if any. Events for
    /// sockets other than the current one are ignored.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Option<Push> {
        match event {
            ConnectionEvent::Opened(id) => {
                if !self.is_current(id) {
                    debug!(conn = %id, "Ignoring open of stale socket");
                    return None;
                }
                info!(conn = %id, url = ?self.url, "Connected");
                self.state = ConnectionState::Connected;
                if let Some(handshake) = self.handshake.clone() {
                    if let Err(e) = self.send(&handshake) {
                        warn!(conn = %id, error = %e, "Failed to send handshake");
                    }
                }
                self.start_keepalive();
                None
            }
            ConnectionEvent::Message(id, text) => {
                if !self.is_current(id) {
                    debug!(conn = %id, "Ignoring message from stale socket");
                    return None;
                }
                match Push::decode(&text) {
                    Ok(Some(push)) => Some(push),
                    Ok(None) => {
                        debug!(conn = %id, frame = %text, "Ignoring unknown verb");
                        None
                    }
                    Err(e) => {
                        warn!(conn = %id, error = %e, "Dropping malformed frame");
                        None
                    }
                }
            }
            ConnectionEvent::Closed(id) => {
                // Release whatever the transport still holds for this socket
                self.transport.close(id);
                if !self.is_current(id) {
                    debug!(conn = %id, "Stale socket closed");
                    return None;
                }
                info!(conn = %id, "Connection closed");
                self.current = None;
                self.state = ConnectionState::Disconnected;
                self.stop_keepalive();
                self.schedule_reconnect();
                None
            }
            ConnectionEvent::Error(id, message) => {
                if !self.is_current(id) {
                    debug!(conn = %id, error = %message, "Ignoring error on stale socket");
                    return None;
                }
                warn!(conn = %id, error = %message, "Connection error, closing");
                self.transport.close(id);
                None
            }
            ConnectionEvent::TimerFired(timer) => {
                if self.reconnect_timer == Some(timer) {
                    self.reconnect_timer = None;
                    info!("Reconnecting");
                    self.open();
                } else if self.keepalive_timer == Some(timer) {
                    self.keepalive_timer = None;
                    if let Err(e) = self.send(&Command::Ping) {
                        warn!(error = %e, "Failed to send keepalive");
                    }
                    self.start_keepalive();
                }
                None
            }
        }
    }

    fn is_current(&self, id: ConnectionId) -> bool {
        self.current == Some(id)
    }

    fn open(&mut self) {
        let Some(url) = self.url.as_deref() else {
            debug!("No address to connect to");
            return;
        };
        let id = self.transport.open(url);
        debug!(conn = %id, url, "Opening socket");
        self.current = Some(id);
        self.state = ConnectionState::Connecting;
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect_timer.is_some() {
            return;
        }
        debug!(delay = ?RECONNECT_DELAY, "Scheduling reconnect");
        self.reconnect_timer = Some(self.scheduler.schedule(RECONNECT_DELAY));
    }

    fn start_keepalive(&mut self) {
        if let Some(interval) = self.keepalive {
            if self.state == ConnectionState::Connected && self.keepalive_timer.is_none() {
                self.keepalive_timer = Some(self.scheduler.schedule(interval));
            }
        }
    }

    fn stop_keepalive(&mut self) {
        if let Some(timer) = self.keepalive_timer.take() {
            self.scheduler.cancel(timer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockScheduler, MockTransport};
    use crate::protocol::UserCommand;
    use ballot_core::Role;

    const URL: &str = "ws://h/ws/id/room";

    fn handshake() -> Command {
        Command::User(UserCommand {
            user_name: "Ann".into(),
            role: Role::Voter,
        })
    }

    fn connected() -> (ConnectionManager<MockTransport, MockScheduler>, ConnectionId) {
        let mut conn = ConnectionManager::new(MockTransport::default(), MockScheduler::default());
        conn.connect(URL, handshake());
        let id = conn.transport().last_opened().unwrap();
        conn.handle_event(ConnectionEvent::Opened(id));
        (conn, id)
    }

    /// Fire every timer due within `by`
    fn advance(conn: &mut ConnectionManager<MockTransport, MockScheduler>, by: Duration) {
        for timer in conn.scheduler_mut().advance(by) {
            conn.handle_event(ConnectionEvent::TimerFired(timer));
        }
    }

    #[test]
    fn test_handshake_on_open() {
        let mut conn = ConnectionManager::new(MockTransport::default(), MockScheduler::default());
        conn.connect(URL, handshake());
        assert_eq!(conn.state(), ConnectionState::Connecting);

        let id = conn.transport().last_opened().unwrap();
        assert_eq!(conn.transport().opened, vec![(id, URL.to_string())]);
        assert!(conn.transport().sent.is_empty());

        conn.handle_event(ConnectionEvent::Opened(id));
        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(
            conn.transport().sent_on(id),
            vec![r#"user {"user_name":"Ann","role":"Voter"}"#]
        );
    }

    #[test]
    fn test_send_dropped_while_connecting() {
        let mut conn = ConnectionManager::new(MockTransport::default(), MockScheduler::default());
        conn.connect(URL, handshake());

        conn.send(&Command::Ping).unwrap();
        assert!(conn.transport().sent.is_empty());
    }

    #[test]
    fn test_close_schedules_exactly_one_reconnect() {
        let (mut conn, id) = connected();

        conn.handle_event(ConnectionEvent::Closed(id));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.scheduler().pending(), 1);
        assert!(conn.reconnect_pending());

        // Nothing happens before the delay elapses
        advance(&mut conn, Duration::from_millis(999));
        assert_eq!(conn.transport().opened.len(), 1);

        advance(&mut conn, Duration::from_millis(1));
        assert_eq!(conn.transport().opened.len(), 2);
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(!conn.reconnect_pending());
    }

    #[test]
    fn test_reconnects_forever() {
        let mut conn = ConnectionManager::new(MockTransport::default(), MockScheduler::default());
        conn.connect(URL, handshake());

        for attempt in 1..=20 {
            let id = conn.transport().last_opened().unwrap();
            conn.handle_event(ConnectionEvent::Error(id, "refused".into()));
            conn.handle_event(ConnectionEvent::Closed(id));
            assert_eq!(conn.scheduler().pending(), 1);

            advance(&mut conn, RECONNECT_DELAY);
            assert_eq!(conn.transport().opened.len(), attempt + 1);
        }
    }

    #[test]
    fn test_error_force_closes_without_scheduling() {
        let (mut conn, id) = connected();

        conn.handle_event(ConnectionEvent::Error(id, "reset".into()));
        assert_eq!(conn.transport().closed, vec![id]);
        assert_eq!(conn.scheduler().pending(), 0);

        // The close that follows the error does the scheduling
        conn.handle_event(ConnectionEvent::Closed(id));
        assert_eq!(conn.scheduler().pending(), 1);
    }

    #[test]
    fn test_no_double_schedule() {
        let (mut conn, id) = connected();

        conn.handle_event(ConnectionEvent::Closed(id));
        conn.handle_event(ConnectionEvent::Closed(id));
        assert_eq!(conn.scheduler().pending(), 1);
    }

    #[test]
    fn test_manual_reconnect_cancels_pending_timer() {
        let (mut conn, id) = connected();
        conn.handle_event(ConnectionEvent::Closed(id));
        assert!(conn.reconnect_pending());

        conn.reconnect();
        assert!(!conn.reconnect_pending());
        assert_eq!(conn.scheduler().pending(), 0);
        assert_eq!(conn.transport().opened.len(), 2);

        // No stray second socket once the old delay passes
        advance(&mut conn, RECONNECT_DELAY * 3);
        assert_eq!(conn.transport().opened.len(), 2);
    }

    #[test]
    fn test_queued_reconnect_timer_ignored_after_manual_reconnect() {
        let (mut conn, id) = connected();
        conn.handle_event(ConnectionEvent::Closed(id));
        let stale = conn.reconnect_timer.unwrap();

        conn.reconnect();
        assert_eq!(conn.transport().opened.len(), 2);

        // The timer had already fired and its event was still queued
        conn.handle_event(ConnectionEvent::TimerFired(stale));
        assert_eq!(conn.transport().opened.len(), 2);
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(!conn.reconnect_pending());
    }

    #[test]
    fn test_manual_reconnect_closes_current() {
        let (mut conn, id) = connected();

        conn.reconnect();
        assert_eq!(conn.transport().closed, vec![id]);
        let fresh = conn.transport().last_opened().unwrap();
        assert_ne!(fresh, id);

        // The old socket's close does not schedule anything
        conn.handle_event(ConnectionEvent::Closed(id));
        assert_eq!(conn.scheduler().pending(), 0);
        assert_eq!(conn.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_stale_events_ignored() {
        let (mut conn, old) = connected();
        conn.reconnect();
        let fresh = conn.transport().last_opened().unwrap();

        assert!(conn
            .handle_event(ConnectionEvent::Message(old, r#"users {"users":[]}"#.into()))
            .is_none());
        conn.handle_event(ConnectionEvent::Opened(old));
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(conn.transport().sent_on(fresh).is_empty());
    }

    #[test]
    fn test_messages_decoded() {
        let (mut conn, id) = connected();

        let push = conn.handle_event(ConnectionEvent::Message(id, r#"users {"users":[]}"#.into()));
        assert_eq!(push, Some(Push::Users(vec![])));
    }

    #[test]
    fn test_unknown_verb_and_malformed_frame_survive() {
        let (mut conn, id) = connected();

        assert!(conn
            .handle_event(ConnectionEvent::Message(id, r#"chat {"a":1}"#.into()))
            .is_none());
        assert!(conn
            .handle_event(ConnectionEvent::Message(id, "stories {broken".into()))
            .is_none());

        assert_eq!(conn.state(), ConnectionState::Connected);
        assert!(conn.transport().closed.is_empty());
        assert_eq!(conn.scheduler().pending(), 0);

        let push = conn.handle_event(ConnectionEvent::Message(id, r#"users {"users":[]}"#.into()));
        assert!(push.is_some());
    }

    #[test]
    fn test_handshake_resent_after_reconnect() {
        let (mut conn, first) = connected();
        conn.set_handshake(Command::User(UserCommand {
            user_name: "Bob".into(),
            role: Role::Watcher,
        }));

        conn.handle_event(ConnectionEvent::Closed(first));
        advance(&mut conn, RECONNECT_DELAY);
        let second = conn.transport().last_opened().unwrap();
        conn.handle_event(ConnectionEvent::Opened(second));

        assert_eq!(
            conn.transport().sent_on(second),
            vec![r#"user {"user_name":"Bob","role":"Watcher"}"#]
        );
    }

    #[test]
    fn test_keepalive_pings_while_connected() {
        let mut conn = ConnectionManager::new(MockTransport::default(), MockScheduler::default())
            .with_keepalive(Some(Duration::from_secs(30)));
        conn.connect(URL, handshake());
        let id = conn.transport().last_opened().unwrap();
        conn.handle_event(ConnectionEvent::Opened(id));

        advance(&mut conn, Duration::from_secs(30));
        advance(&mut conn, Duration::from_secs(30));
        let pings = conn
            .transport()
            .sent_on(id)
            .into_iter()
            .filter(|frame| *frame == "ping")
            .count();
        assert_eq!(pings, 2);

        // Closing stops the pings; only the reconnect timer remains
        conn.handle_event(ConnectionEvent::Closed(id));
        assert_eq!(conn.scheduler().pending(), 1);
    }

    #[test]
    fn test_zero_keepalive_disabled() {
        let mut conn = ConnectionManager::new(MockTransport::default(), MockScheduler::default())
            .with_keepalive(Some(Duration::ZERO));
        conn.connect(URL, handshake());
        let id = conn.transport().last_opened().unwrap();
        conn.handle_event(ConnectionEvent::Opened(id));

        assert_eq!(conn.scheduler().pending(), 0);
    }
}
