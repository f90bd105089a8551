//! WebSocket transport and tokio timers
//!
//! Every socket runs in its own task and reports through one shared event
//! channel. The engine consumes that channel from a single task, so frames are
//! processed in delivery order.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::{ConnectionEvent, ConnectionId, Scheduler, TimerId, Transport};

pub type EventSender = mpsc::UnboundedSender<ConnectionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ConnectionEvent>;

/// Channel shared by a [`WsTransport`] and a [`TokioScheduler`]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

enum WsCommand {
    Send(String),
    Close,
}

/// Transport backed by tokio-tungstenite. Must be used inside a tokio runtime.
pub struct WsTransport {
    events: EventSender,
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<WsCommand>>,
    next_id: u64,
}

impl WsTransport {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            connections: HashMap::new(),
            next_id: 0,
        }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, url: &str) -> ConnectionId {
        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        self.connections.insert(id, cmd_tx);
        tokio::spawn(connection_task(id, url.to_string(), self.events.clone(), cmd_rx));
        id
    }

    fn send(&mut self, id: ConnectionId, text: String) -> Result<()> {
        let commands = self.connections.get(&id).ok_or(Error::NotConnected)?;
        commands
            .send(WsCommand::Send(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&mut self, id: ConnectionId) {
        if let Some(commands) = self.connections.remove(&id) {
            let _ = commands.send(WsCommand::Close);
        }
    }
}

async fn connection_task(
    id: ConnectionId,
    url: String,
    events: EventSender,
    mut commands: mpsc::UnboundedReceiver<WsCommand>,
) {
    // Closing the handle before the handshake finishes abandons the attempt
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => Some(result),
        _ = wait_for_close(&mut commands) => None,
    };

    match connected {
        Some(Ok((stream, _))) => {
            let _ = events.send(ConnectionEvent::Opened(id));
            let (mut write, mut read) = stream.split();
            loop {
                tokio::select! {
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let _ = events.send(ConnectionEvent::Message(id, text));
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            let _ = events.send(ConnectionEvent::Error(id, e.to_string()));
                            break;
                        }
                    },
                    command = commands.recv() => match command {
                        Some(WsCommand::Send(text)) => {
                            if let Err(e) = write.send(Message::Text(text)).await {
                                let _ = events.send(ConnectionEvent::Error(id, e.to_string()));
                                break;
                            }
                        }
                        Some(WsCommand::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                }
            }
        }
        Some(Err(e)) => {
            warn!(conn = %id, url = %url, error = %e, "Failed to connect");
            let _ = events.send(ConnectionEvent::Error(id, e.to_string()));
        }
        None => debug!(conn = %id, "Connect abandoned"),
    }

    let _ = events.send(ConnectionEvent::Closed(id));
}

/// Resolves once a close is requested or the handle is dropped; sends queued
/// before the socket opens are discarded
async fn wait_for_close(commands: &mut mpsc::UnboundedReceiver<WsCommand>) {
    while let Some(command) = commands.recv().await {
        if matches!(command, WsCommand::Close) {
            return;
        }
    }
}

/// Timers backed by spawned sleeps
pub struct TokioScheduler {
    events: EventSender,
    timers: HashMap<TimerId, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            timers: HashMap::new(),
            next_id: 0,
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.timers.retain(|_, handle| !handle.is_finished());

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ConnectionEvent::TimerFired(id));
        });
        self.timers.insert(id, handle);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }
}
