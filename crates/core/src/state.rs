//! Local mirror of a room
//!
//! Holds the server-pushed config, roster and story list together with the
//! client-only selection, dialog and draft state. Snapshots replace their
//! field wholesale; nothing is merged.

use tracing::{debug, warn};

use crate::models::{RoomConfig, Story, StoryId, User};

/// Which story is looked at locally, and which one the owner broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSelection {
    /// Locally selected story (client-only)
    pub selected: Option<StoryId>,
    /// Last active story broadcast by the owner
    pub server_active: Option<StoryId>,
}

/// Dialogs the presentation can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    AddStories,
    FinishVoting,
}

/// Dialog visibility flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dialogs {
    pub add_stories: bool,
    pub finish_voting: bool,
}

/// Text being edited before it is submitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drafts {
    /// Freeform story list, see [`crate::parser::parse_story_list`]
    pub stories_text: String,
    /// Final estimate; only ever holds text that parses as a number (or is empty)
    pub final_vote_text: String,
}

/// Complete client-side view of one room
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomState {
    pub config: Option<RoomConfig>,
    pub users: Vec<User>,
    pub stories: Vec<Story>,
    pub selection: LocalSelection,
    pub dialogs: Dialogs,
    pub drafts: Drafts,
}

impl RoomState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the room config
    pub fn apply_config(&mut self, config: RoomConfig) {
        debug!(me = %config.me, owner = %config.owner, "Applying config");
        self.config = Some(config);
    }

    /// Replace the roster
    pub fn apply_users(&mut self, users: Vec<User>) {
        debug!(count = users.len(), "Applying users snapshot");
        self.users = users;
    }

    /// Replace the story list and follow the owner's active story.
    ///
    /// The local selection jumps to the broadcast story only when the
    /// broadcast value differs from the last one seen, which also covers the
    /// first time any value is observed. A story never moves backwards: a
    /// snapshot reporting an earlier state keeps the previous one.
    pub fn apply_stories(&mut self, mut stories: Vec<Story>, active_story: Option<StoryId>) {
        debug!(
            count = stories.len(),
            active = ?active_story.as_ref().map(StoryId::as_str),
            "Applying stories snapshot"
        );

        for story in &mut stories {
            let Some(previous) = self.stories.iter().find(|s| s.id == story.id) else {
                continue;
            };
            if !previous.state.can_advance_to(story.state) {
                warn!(
                    story = %story.id,
                    from = ?previous.state,
                    to = ?story.state,
                    "Story state went backwards"
                );
                story.state = previous.state;
            }
        }
        self.stories = stories;

        if active_story.is_some() && active_story != self.selection.server_active {
            self.selection.selected = active_story.clone();
        }
        if active_story.is_some() {
            self.selection.server_active = active_story;
        }
    }

    /// Select a story locally without telling the server
    pub fn select_story(&mut self, id: StoryId) {
        self.selection.selected = Some(id);
    }

    pub fn set_dialog(&mut self, dialog: Dialog, open: bool) {
        match dialog {
            Dialog::AddStories => self.dialogs.add_stories = open,
            Dialog::FinishVoting => self.dialogs.finish_voting = open,
        }
    }

    pub fn is_dialog_open(&self, dialog: Dialog) -> bool {
        match dialog {
            Dialog::AddStories => self.dialogs.add_stories,
            Dialog::FinishVoting => self.dialogs.finish_voting,
        }
    }

    pub fn set_stories_draft(&mut self, text: impl Into<String>) {
        self.drafts.stories_text = text.into();
    }

    /// Accept `candidate` into the final vote draft only if it parses as a
    /// number or clears the field. Returns whether it was accepted; rejected
    /// input leaves the previous draft in place.
    pub fn set_final_vote_draft(&mut self, candidate: &str) -> bool {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() && trimmed.parse::<f64>().is_err() {
            return false;
        }
        self.drafts.final_vote_text = candidate.to_string();
        true
    }

    /// The parsed final vote draft
    pub fn final_vote_draft(&self) -> Option<f64> {
        self.drafts.final_vote_text.trim().parse().ok()
    }

    pub fn find_story(&self, id: &StoryId) -> Option<&Story> {
        self.stories.iter().find(|s| &s.id == id)
    }
}
