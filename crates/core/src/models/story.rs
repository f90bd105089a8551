//! Story models

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{PubUserId, Vote};

/// Server-issued story id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub String);

impl StoryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Voting lifecycle of a story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoryState {
    /// Votes are being collected and stay concealed
    Voting,
    /// Votes were revealed early by the owner
    Flipped,
    /// A final estimate was recorded; terminal
    Finished,
}

impl StoryState {
    /// Whether `next` is a legal observation after `self`.
    ///
    /// Staying in the same state is always legal.
    pub fn can_advance_to(self, next: StoryState) -> bool {
        use StoryState::*;
        matches!(
            (self, next),
            (Voting, _) | (Flipped, Flipped) | (Flipped, Finished) | (Finished, Finished)
        )
    }

    /// Voting or Flipped
    pub fn is_open(self) -> bool {
        self != StoryState::Finished
    }

    pub fn is_terminal(self) -> bool {
        self == StoryState::Finished
    }
}

/// Url and description of a story, as submitted or parsed from text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryItem {
    pub story_url: String,
    pub story_description: String,
}

/// A story in the room's list
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub id: StoryId,
    pub url: String,
    pub description: String,
    pub state: StoryState,
    pub votes: HashMap<PubUserId, Vote>,
    pub final_vote: Option<f64>,
}

impl Story {
    pub fn vote_of(&self, user: &PubUserId) -> Option<&Vote> {
        self.votes.get(user)
    }
}
