//! Network protocol message types
//!
//! Server pushes replace client state on receipt. Client commands are
//! fire-and-forget: no envelope, no correlation id, no acknowledgement. A
//! command's only confirmation is its effect showing up in a later push.

use std::collections::HashMap;

use ballot_core::{
    Identity, PubUserId, Role, RoomConfig, Story, StoryId, StoryItem, StoryState, User, Vote,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::{encode_frame, split_frame};

/// Frame verbs
pub mod verb {
    pub const CONFIG: &str = "config";
    pub const USERS: &str = "users";
    pub const STORIES: &str = "stories";
    pub const USER: &str = "user";
    pub const VOTE: &str = "vote";
    pub const FINISH: &str = "finish";
    pub const REMOVE_STORY: &str = "remove_story";
    pub const FLIP: &str = "flip";
    pub const ACTIVE_STORY: &str = "active_story";
    pub const PING: &str = "ping";
}

// ---------------------------------------------------------------------------
// Server -> client payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigPayload {
    pub vote_options: Vec<f64>,
    pub owner: PubUserId,
    pub me: PubUserId,
    pub room_creation_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub pub_user_uuid: PubUserId,
    pub user_name: String,
    pub role: Role,
    pub is_this: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersPayload {
    pub users: Vec<UserPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryPayload {
    pub story_uuid: StoryId,
    pub story: StoryItem,
    pub state: StoryState,
    pub votes: HashMap<PubUserId, Vote>,
    #[serde(default)]
    pub final_vote: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoriesPayload {
    pub stories: Vec<StoryPayload>,
    #[serde(default)]
    pub active_story: Option<StoryId>,
}

impl From<ConfigPayload> for RoomConfig {
    fn from(p: ConfigPayload) -> Self {
        RoomConfig {
            vote_options: p.vote_options,
            owner: p.owner,
            me: p.me,
            room_creation_time: p.room_creation_time,
        }
    }
}

impl From<UserPayload> for User {
    fn from(p: UserPayload) -> Self {
        User {
            id: p.pub_user_uuid,
            name: p.user_name,
            role: p.role,
            is_self: p.is_this,
            is_active: p.is_active,
        }
    }
}

impl From<StoryPayload> for Story {
    fn from(p: StoryPayload) -> Self {
        Story {
            id: p.story_uuid,
            url: p.story.story_url,
            description: p.story.story_description,
            state: p.state,
            votes: p.votes,
            final_vote: p.final_vote,
        }
    }
}

/// A decoded server push
#[derive(Debug, Clone, PartialEq)]
pub enum Push {
    Config(RoomConfig),
    Users(Vec<User>),
    Stories {
        stories: Vec<Story>,
        active_story: Option<StoryId>,
    },
}

impl Push {
    /// Decode a text frame.
    ///
    /// Unknown verbs yield `Ok(None)` so newer servers can add pushes. A known
    /// verb with a malformed payload is an error.
    pub fn decode(text: &str) -> Result<Option<Push>> {
        let frame = split_frame(text);
        let push = match frame.verb {
            verb::CONFIG => {
                let payload: ConfigPayload = parse_payload(frame.verb, frame.payload)?;
                Push::Config(payload.into())
            }
            verb::USERS => {
                let payload: UsersPayload = parse_payload(frame.verb, frame.payload)?;
                Push::Users(payload.users.into_iter().map(User::from).collect())
            }
            verb::STORIES => {
                let payload: StoriesPayload = parse_payload(frame.verb, frame.payload)?;
                Push::Stories {
                    stories: payload.stories.into_iter().map(Story::from).collect(),
                    active_story: payload.active_story,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(push))
    }
}

fn parse_payload<T: DeserializeOwned>(verb: &str, payload: &str) -> Result<T> {
    serde_json::from_str(payload).map_err(|source| Error::Decode {
        verb: verb.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Client -> server commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCommand {
    pub user_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddStoriesCommand {
    pub stories: Vec<StoryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteCommand {
    pub story_uuid: StoryId,
    pub vote: Vote,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishCommand {
    pub story_uuid: StoryId,
    pub final_vote: f64,
}

/// Payload of the commands that only name a story
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryRef {
    pub story_uuid: StoryId,
}

/// Network protocol commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Announce name and role; sent as the handshake on every open
    User(UserCommand),
    AddStories(AddStoriesCommand),
    Vote(VoteCommand),
    Finish(FinishCommand),
    RemoveStory(StoryRef),
    Flip(StoryRef),
    ActiveStory(StoryRef),
    /// Keepalive, ignored by the server
    Ping,
}

impl Command {
    /// Handshake command for an identity
    pub fn user(identity: &Identity) -> Self {
        Command::User(UserCommand {
            user_name: identity.user_name.clone(),
            role: identity.role,
        })
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Command::User(_) => verb::USER,
            Command::AddStories(_) => verb::STORIES,
            Command::Vote(_) => verb::VOTE,
            Command::Finish(_) => verb::FINISH,
            Command::RemoveStory(_) => verb::REMOVE_STORY,
            Command::Flip(_) => verb::FLIP,
            Command::ActiveStory(_) => verb::ACTIVE_STORY,
            Command::Ping => verb::PING,
        }
    }

    /// Encode as a text frame
    pub fn encode(&self) -> Result<String> {
        let verb = self.verb();
        match self {
            Command::User(payload) => encode_frame(verb, payload),
            Command::AddStories(payload) => encode_frame(verb, payload),
            Command::Vote(payload) => encode_frame(verb, payload),
            Command::Finish(payload) => encode_frame(verb, payload),
            Command::RemoveStory(payload)
            | Command::Flip(payload)
            | Command::ActiveStory(payload) => encode_frame(verb, payload),
            Command::Ping => Ok(verb.to_string()),
        }
    }
}
