//! Room page and socket addresses
//!
//! Page format: `http://<host>/?room=<room-uuid>`
//! Socket format: `ws://<host>/ws/<identity-uuid>/<room-uuid>`

use std::fmt;

use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Query parameter holding the room uuid
pub const ROOM_PARAM: &str = "room";

/// A room reachable through a page address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAddress {
    page: Url,
    /// `ws://host[:port]/`, validated as a base for path segments
    socket_base: Url,
    host: String,
    room_uuid: String,
}

impl RoomAddress {
    /// Parse a page address.
    ///
    /// A missing or empty `room` parameter is filled with a freshly generated
    /// uuid and written back into the page address. The flag reports whether
    /// that happened, so callers can surface the new shareable address.
    pub fn from_page_url(s: &str) -> Result<(Self, bool)> {
        let mut page =
            Url::parse(s).map_err(|e| Error::InvalidAddress(format!("'{}': {}", s, e)))?;

        let host = match (page.host_str(), page.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::InvalidAddress(format!("'{}' has no host", s))),
        };

        let existing = page
            .query_pairs()
            .find(|(key, _)| key == ROOM_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        let (room_uuid, generated) = match existing {
            Some(room) => (room, false),
            None => {
                let room = Uuid::new_v4().to_string();
                let others: Vec<(String, String)> = page
                    .query_pairs()
                    .filter(|(key, _)| key != ROOM_PARAM)
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();
                page.query_pairs_mut()
                    .clear()
                    .extend_pairs(others)
                    .append_pair(ROOM_PARAM, &room);
                (room, true)
            }
        };

        let mut socket_base = page.clone();
        socket_base
            .set_scheme("ws")
            .map_err(|_| Error::InvalidAddress(format!("'{}' cannot carry a socket", s)))?;
        socket_base.set_path("/");
        socket_base.set_query(None);
        socket_base.set_fragment(None);
        if socket_base.cannot_be_a_base() {
            return Err(Error::InvalidAddress(format!("'{}' cannot carry a socket", s)));
        }

        Ok((
            Self {
                page,
                socket_base,
                host,
                room_uuid,
            },
            generated,
        ))
    }

    pub fn room_uuid(&self) -> &str {
        &self.room_uuid
    }

    /// `host[:port]` of the page
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Shareable page address, always carrying the room parameter
    pub fn page_url(&self) -> &str {
        self.page.as_str()
    }

    /// Socket address for a given local identity. The room id is
    /// percent-encoded as a single path segment.
    pub fn ws_url(&self, identity_uuid: Uuid) -> String {
        let mut url = self.socket_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .clear()
                .push("ws")
                .push(&identity_uuid.to_string())
                .push(&self.room_uuid);
        }
        url.into()
    }
}

impl fmt::Display for RoomAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.page_url())
    }
}
