//! Permission system for room actions
//!
//! The server is the authority; these predicates only decide which actions
//! the client offers.

use crate::models::StoryState;
use crate::state::RoomState;

/// Privileged actions on the locally selected story
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    /// Record a final estimate
    FinishVoting,
    /// Reveal concealed votes early
    ForceFlip,
    /// Broadcast the selection as the room's active story
    SetServerActive,
    /// Remove the story from the room
    DeleteStory,
}

/// Permission matrix for room actions
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Whether this client is the room owner
    pub fn is_owner(room: &RoomState) -> bool {
        room.config
            .as_ref()
            .map(|config| config.me == config.owner)
            .unwrap_or(false)
    }

    /// Check if this client may perform an action right now
    pub fn can_perform(room: &RoomState, action: RoomAction) -> bool {
        if !Self::is_owner(room) {
            return false;
        }

        let active = room.active_story();
        match action {
            RoomAction::FinishVoting => active
                .map(|story| matches!(story.state, StoryState::Voting | StoryState::Flipped))
                .unwrap_or(false),
            RoomAction::ForceFlip => room.has_hidden_vote(),
            RoomAction::SetServerActive => active
                .map(|story| {
                    !story.state.is_terminal()
                        && room.selection.server_active.as_ref() != Some(&story.id)
                })
                .unwrap_or(false),
            RoomAction::DeleteStory => active.is_some(),
        }
    }

    /// All actions currently permitted, in declaration order
    pub fn permitted(room: &RoomState) -> Vec<RoomAction> {
        [
            RoomAction::FinishVoting,
            RoomAction::ForceFlip,
            RoomAction::SetServerActive,
            RoomAction::DeleteStory,
        ]
        .into_iter()
        .filter(|action| Self::can_perform(room, *action))
        .collect()
    }
}

impl RoomState {
    pub fn is_owner(&self) -> bool {
        PermissionMatrix::is_owner(self)
    }

    pub fn can(&self, action: RoomAction) -> bool {
        PermissionMatrix::can_perform(self, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoomConfig, Vote};
    use crate::state::tests::story;

    fn room(me: &str, state: StoryState) -> RoomState {
        let mut room = RoomState::new();
        room.apply_config(RoomConfig {
            vote_options: vec![1.0, 2.0, 3.0],
            owner: "owner".into(),
            me: me.into(),
            room_creation_time: String::new(),
        });
        room.apply_stories(
            vec![story("S1", state), story("S2", StoryState::Voting)],
            Some("S1".into()),
        );
        room
    }

    #[test]
    fn test_non_owner_has_no_privileges() {
        let room = room("guest", StoryState::Voting);
        assert!(!room.is_owner());
        assert!(PermissionMatrix::permitted(&room).is_empty());
    }

    #[test]
    fn test_owner_without_config() {
        let mut room = room("owner", StoryState::Voting);
        room.config = None;
        assert!(!room.is_owner());
    }

    #[test]
    fn test_finish_voting_requires_open_story() {
        assert!(room("owner", StoryState::Voting).can(RoomAction::FinishVoting));
        assert!(room("owner", StoryState::Flipped).can(RoomAction::FinishVoting));
        assert!(!room("owner", StoryState::Finished).can(RoomAction::FinishVoting));
    }

    #[test]
    fn test_force_flip_requires_hidden_vote() {
        let mut room = room("owner", StoryState::Voting);
        assert!(!room.can(RoomAction::ForceFlip));

        let mut s = story("S1", StoryState::Voting);
        s.votes.insert("someone".into(), Vote::Hidden);
        room.apply_stories(vec![s], Some("S1".into()));
        assert!(room.can(RoomAction::ForceFlip));
    }

    #[test]
    fn test_set_server_active() {
        let mut room = room("owner", StoryState::Voting);
        // Already the broadcast story
        assert!(!room.can(RoomAction::SetServerActive));

        room.select_story("S2".into());
        assert!(room.can(RoomAction::SetServerActive));

        room.apply_stories(
            vec![story("S1", StoryState::Voting), story("S2", StoryState::Finished)],
            Some("S1".into()),
        );
        assert!(!room.can(RoomAction::SetServerActive));
    }

    #[test]
    fn test_delete_requires_selection() {
        let mut room = room("owner", StoryState::Finished);
        assert!(room.can(RoomAction::DeleteStory));

        room.select_story("gone".into());
        assert!(!room.can(RoomAction::DeleteStory));
    }
}
