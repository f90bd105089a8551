//! Room configuration and roster models

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Format of the server's room creation timestamp
const CREATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Server-issued public user id.
///
/// Distinct from the local identity uuid; this is the key of roster entries
/// and vote maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PubUserId(pub String);

impl PubUserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PubUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PubUserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Room configuration pushed by the server after the handshake
#[derive(Debug, Clone, PartialEq)]
pub struct RoomConfig {
    /// Cards offered for voting, in display order
    pub vote_options: Vec<f64>,
    pub owner: PubUserId,
    /// This client's public id
    pub me: PubUserId,
    pub room_creation_time: String,
}

impl RoomConfig {
    /// Parsed room creation time, if the server used the expected format
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.room_creation_time, CREATION_TIME_FORMAT).ok()
    }

    pub fn is_vote_option(&self, value: f64) -> bool {
        self.vote_options.iter().any(|option| *option == value)
    }
}

/// A roster entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: PubUserId,
    pub name: String,
    pub role: Role,
    /// Set by the server on the entry describing the receiving client
    pub is_self: bool,
    /// False while the participant has no live connection
    pub is_active: bool,
}

impl User {
    pub fn is_voting(&self) -> bool {
        self.is_active && self.role == Role::Voter
    }
}
