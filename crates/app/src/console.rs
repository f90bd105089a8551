//! Console presentation
//!
//! Turns input lines into intents and renders the room mirror as text. Both
//! halves are pure; the session loop in `main` wires them to the engine.

use std::fmt::Write;

use ballot_core::{PermissionMatrix, Role, RoomAction, RoomState, StoryId, Vote};
use ballot_net::ConnectionState;

use crate::error::{AppError, Result};

pub const HELP: &str = "\
Commands:
  name <text>            change display name
  role voter|watcher     change role
  add <text>             add stories from pasted text (urls start stories)
  select <n|story-uuid>  select a story locally
  vote <n|coffee|?>      vote on the selected story
  final <n>              draft the final estimate
  finish                 finish the selected story with the drafted estimate
  flip                   reveal the votes of the selected story
  activate               make the selected story active for everyone
  remove                 remove the selected story
  reconnect              drop the connection and reconnect now
  show                   print the room
  quit                   leave";

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Name(String),
    Role(Role),
    Add(String),
    Select(String),
    Vote(Vote),
    Final(String),
    Finish,
    Flip,
    Activate,
    Remove,
    Reconnect,
    Show,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_intent(line: &str) -> Result<Option<Intent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let intent = match command.to_ascii_lowercase().as_str() {
        "name" => Intent::Name(required(command, rest)?.to_string()),
        "role" => Intent::Role(required(command, rest)?.parse()?),
        "add" => Intent::Add(required(command, rest)?.to_string()),
        "select" => Intent::Select(required(command, rest)?.to_string()),
        "vote" => Intent::Vote(required(command, rest)?.parse()?),
        "final" => Intent::Final(rest.to_string()),
        "finish" => Intent::Finish,
        "flip" => Intent::Flip,
        "activate" => Intent::Activate,
        "remove" => Intent::Remove,
        "reconnect" => Intent::Reconnect,
        "show" => Intent::Show,
        "help" | "?" => Intent::Help,
        "quit" | "exit" => Intent::Quit,
        other => {
            return Err(AppError::Usage(format!(
                "unknown command '{}', try 'help'",
                other
            )))
        }
    };
    Ok(Some(intent))
}

fn required<'a>(command: &str, rest: &'a str) -> Result<&'a str> {
    if rest.is_empty() {
        return Err(AppError::Usage(format!("'{}' needs an argument", command)));
    }
    Ok(rest)
}

/// Resolve a `select` argument: a 1-based position in the story list, or a
/// story uuid
pub fn resolve_story(room: &RoomState, arg: &str) -> Option<StoryId> {
    if let Ok(position) = arg.parse::<usize>() {
        if let Some(story) = position.checked_sub(1).and_then(|i| room.stories.get(i)) {
            return Some(story.id.clone());
        }
    }
    let id = StoryId::from(arg);
    room.find_story(&id).map(|story| story.id.clone())
}

fn action_command(action: RoomAction) -> &'static str {
    match action {
        RoomAction::FinishVoting => "finish",
        RoomAction::ForceFlip => "flip",
        RoomAction::SetServerActive => "activate",
        RoomAction::DeleteStory => "remove",
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
    }
}

/// Render the room as text
pub fn render(room: &RoomState, state: ConnectionState) -> String {
    let mut out = String::new();

    let _ = write!(out, "[{}]", connection_label(state));
    if let Some(config) = &room.config {
        match config.created_at() {
            Some(created) => {
                let _ = write!(out, " room created {}", created.format("%Y-%m-%d %H:%M"));
            }
            None => {
                let _ = write!(out, " room created {}", config.room_creation_time);
            }
        }
        let cards: Vec<String> = config.vote_options.iter().map(|v| v.to_string()).collect();
        let _ = write!(out, " | cards: {}", cards.join(" "));
        if room.is_owner() {
            out.push_str(" | you own this room");
        }
    }
    out.push('\n');

    out.push_str("Users:\n");
    let me = room.me().map(|user| &user.id);
    for user in &room.users {
        let _ = write!(out, "  {} ({})", user.name, user.role);
        if Some(&user.id) == me {
            out.push_str(" [you]");
        }
        if !user.is_active {
            out.push_str(" away");
        }
        out.push('\n');
    }

    out.push_str("Stories:\n");
    for (index, story) in room.stories.iter().enumerate() {
        let marker = if room.selection.selected.as_ref() == Some(&story.id) {
            '>'
        } else {
            ' '
        };
        let _ = write!(
            out,
            "{} {}. [{:?}] {} {}",
            marker,
            index + 1,
            story.state,
            story.url,
            story.description.trim_end()
        );
        if room.selection.server_active.as_ref() == Some(&story.id) {
            out.push_str(" (active)");
        }
        if let Some(final_vote) = story.final_vote {
            let _ = write!(out, " final={}", final_vote);
        }
        out.push('\n');
    }

    if let Some(story) = room.active_story() {
        let mut votes: Vec<String> = room
            .users
            .iter()
            .filter_map(|user| story.vote_of(&user.id).map(|vote| format!("{}={}", user.name, vote)))
            .collect();
        let unknown = story
            .votes
            .iter()
            .filter(|(id, _)| !room.users.iter().any(|user| &user.id == *id))
            .count();
        if unknown > 0 {
            votes.push(format!("+{} from departed users", unknown));
        }
        let _ = writeln!(out, "Votes on {}: {}", story.id, votes.join(", "));

        match room.consensus() {
            Some(consensus) => {
                let _ = write!(out, "Consensus: {}", consensus);
            }
            None => out.push_str("Consensus: -"),
        }
        if room.has_hidden_vote() {
            out.push_str(" (some votes hidden)");
        }
        if let Some(vote) = room.my_vote() {
            let _ = write!(out, " | your vote: {}", vote);
        }
        out.push('\n');

        let pending: Vec<&str> = room
            .pending_voters()
            .into_iter()
            .map(|user| user.name.as_str())
            .collect();
        if !pending.is_empty() {
            let _ = writeln!(out, "Waiting on: {}", pending.join(", "));
        }
    }

    let actions: Vec<&str> = PermissionMatrix::permitted(room)
        .into_iter()
        .map(action_command)
        .collect();
    if !actions.is_empty() {
        let _ = writeln!(out, "You can: {}", actions.join(", "));
    }
    if !room.drafts.final_vote_text.is_empty() {
        let _ = writeln!(out, "Final estimate draft: {}", room.drafts.final_vote_text);
    }

    out
}
