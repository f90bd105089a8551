//! Ballot Network Library
//!
//! Keeps a local room mirror in sync with a planning-poker server over one
//! self-healing WebSocket.
//!
//! # Architecture
//!
//! - **Protocol**: verb-prefixed JSON text frames, pushes in and commands out
//! - **Connection**: synchronous engine driven by transport and timer events
//! - **Sync**: applies pushes to the room mirror and publishes each change
//! - **Ws**: tokio-tungstenite transport and tokio timers feeding one channel
//!
//! # Usage
//!
//! ```ignore
//! let (events_tx, mut events) = event_channel();
//! let connection = ConnectionManager::new(
//!     WsTransport::new(events_tx.clone()),
//!     TokioScheduler::new(events_tx),
//! );
//! let mut synced = SyncedState::new(connection);
//! synced.connect(&address, &identity);
//!
//! while let Some(event) = events.recv().await {
//!     if synced.handle_event(event) {
//!         render(&synced.room());
//!     }
//! }
//! ```

pub mod address;
pub mod connection;
pub mod error;
mod frame;
#[cfg(test)]
mod mock;
pub mod protocol;
pub mod sync;
pub mod transport;
pub mod ws;

pub use address::RoomAddress;
pub use connection::{ConnectionManager, ConnectionState, RECONNECT_DELAY};
pub use error::{Error, Result};
pub use protocol::{Command, Push};
pub use sync::SyncedState;
pub use transport::{ConnectionEvent, ConnectionId, Scheduler, TimerId, Transport};
pub use ws::{event_channel, EventReceiver, EventSender, TokioScheduler, WsTransport};

/// Default port of a Ballot server
pub const DEFAULT_PORT: u16 = 15000;
