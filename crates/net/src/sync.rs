//! Synchronized room state
//!
//! [`SyncedState`] owns the connection and the local room mirror. Every
//! inbound frame is applied to the mirror in one step and published once, so
//! observers never see a roster and a story list from different snapshots.
//! User intents become commands on the connection; their effect only shows
//! up when the server echoes it back in a later snapshot.

use ballot_core::{parse_story_list, Dialog, Identity, RoomState, StoryId, StoryItem, Vote};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::address::RoomAddress;
use crate::connection::ConnectionManager;
use crate::error::{Error, Result};
use crate::protocol::{AddStoriesCommand, Command, FinishCommand, Push, StoryRef, VoteCommand};
use crate::transport::{ConnectionEvent, Scheduler, Transport};

/// Room mirror plus the connection feeding it
pub struct SyncedState<T, S> {
    connection: ConnectionManager<T, S>,
    publisher: watch::Sender<RoomState>,
}

impl<T: Transport, S: Scheduler> SyncedState<T, S> {
    pub fn new(connection: ConnectionManager<T, S>) -> Self {
        Self {
            connection,
            publisher: watch::Sender::new(RoomState::new()),
        }
    }

    /// Observe every published room state
    pub fn subscribe(&self) -> watch::Receiver<RoomState> {
        self.publisher.subscribe()
    }

    /// Current room state
    pub fn room(&self) -> watch::Ref<'_, RoomState> {
        self.publisher.borrow()
    }

    pub fn connection(&self) -> &ConnectionManager<T, S> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut ConnectionManager<T, S> {
        &mut self.connection
    }

    /// Join a room as `identity`
    pub fn connect(&mut self, address: &RoomAddress, identity: &Identity) {
        info!(room = address.room_uuid(), user_uuid = %identity.user_uuid, "Joining room");
        self.connection
            .connect(address.ws_url(identity.user_uuid), Command::user(identity));
    }

    /// Feed one connection event through the engine. Returns whether the room
    /// state changed.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> bool {
        match self.connection.handle_event(event) {
            Some(push) => {
                self.apply(push);
                true
            }
            None => false,
        }
    }

    /// Apply a decoded push as one atomic update
    pub fn apply(&self, push: Push) {
        self.publisher.send_modify(|room| match push {
            Push::Config(config) => room.apply_config(config),
            Push::Users(users) => room.apply_users(users),
            Push::Stories {
                stories,
                active_story,
            } => room.apply_stories(stories, active_story),
        });
    }

    // -----------------------------------------------------------------------
    // Local-only mutators
    // -----------------------------------------------------------------------

    pub fn select_story(&self, id: StoryId) {
        self.publisher.send_modify(|room| room.select_story(id));
    }

    pub fn set_dialog(&self, dialog: Dialog, open: bool) {
        self.publisher.send_if_modified(|room| {
            let changed = room.is_dialog_open(dialog) != open;
            room.set_dialog(dialog, open);
            changed
        });
    }

    pub fn set_stories_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.publisher.send_modify(|room| room.set_stories_draft(text));
    }

    /// Offer a new final vote draft; non-numeric input is silently rejected
    pub fn set_final_vote_draft(&self, candidate: &str) -> bool {
        let mut accepted = false;
        self.publisher.send_if_modified(|room| {
            accepted = room.set_final_vote_draft(candidate);
            accepted
        });
        accepted
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Announce a new name or role; also used as the handshake from now on
    pub fn send_identity(&mut self, identity: &Identity) -> Result<()> {
        let command = Command::user(identity);
        self.connection.set_handshake(command.clone());
        self.connection.send(&command)
    }

    /// Submit a batch of stories
    pub fn add_stories(&mut self, stories: Vec<StoryItem>) -> Result<()> {
        if stories.is_empty() {
            debug!("No stories to add");
            return Ok(());
        }
        self.connection
            .send(&Command::AddStories(AddStoriesCommand { stories }))
    }

    /// Parse and submit the story draft, then clear it and close its dialog.
    /// Returns how many stories were submitted.
    pub fn submit_stories_draft(&mut self) -> Result<usize> {
        let stories = parse_story_list(&self.room().drafts.stories_text);
        let count = stories.len();
        self.add_stories(stories)?;
        self.publisher.send_modify(|room| {
            room.set_stories_draft(String::new());
            room.set_dialog(Dialog::AddStories, false);
        });
        Ok(count)
    }

    /// Vote on the selected story
    pub fn vote(&mut self, vote: Vote) -> Result<()> {
        if vote.is_hidden() {
            return Err(Error::Protocol("a hidden vote cannot be cast".to_string()));
        }
        let story_uuid = self.selected()?;
        self.connection
            .send(&Command::Vote(VoteCommand { story_uuid, vote }))
    }

    /// Close voting on the selected story with a final estimate taken from the
    /// room's vote options
    pub fn finish_voting(&mut self, final_vote: f64) -> Result<()> {
        let story_uuid = self.selected()?;
        let allowed = self
            .room()
            .config
            .as_ref()
            .is_some_and(|config| config.is_vote_option(final_vote));
        if !allowed {
            return Err(Error::NotAVoteOption(final_vote));
        }
        self.connection.send(&Command::Finish(FinishCommand {
            story_uuid,
            final_vote,
        }))
    }

    /// Finish with the drafted estimate, then clear the draft and close its
    /// dialog
    pub fn finish_voting_from_draft(&mut self) -> Result<()> {
        let draft = self.room().drafts.final_vote_text.clone();
        let value = self
            .room()
            .final_vote_draft()
            .ok_or_else(|| Error::InvalidDraft(format!("'{}' is not a number", draft)))?;
        self.finish_voting(value)?;
        self.publisher.send_modify(|room| {
            room.set_final_vote_draft("");
            room.set_dialog(Dialog::FinishVoting, false);
        });
        Ok(())
    }

    /// Remove the selected story
    pub fn remove_story(&mut self) -> Result<()> {
        let story_uuid = self.selected()?;
        self.connection
            .send(&Command::RemoveStory(StoryRef { story_uuid }))
    }

    /// Reveal the votes of the selected story
    pub fn flip(&mut self) -> Result<()> {
        let story_uuid = self.selected()?;
        self.connection.send(&Command::Flip(StoryRef { story_uuid }))
    }

    /// Make the selected story the room's active story
    pub fn set_active_story(&mut self) -> Result<()> {
        let story_uuid = self.selected()?;
        self.connection
            .send(&Command::ActiveStory(StoryRef { story_uuid }))
    }

    fn selected(&self) -> Result<StoryId> {
        self.room()
            .selection
            .selected
            .clone()
            .ok_or(Error::NoStorySelected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockScheduler, MockTransport};
    use crate::transport::ConnectionId;
    use ballot_core::{Role, StoryState};
    use uuid::Uuid;

    const CONFIG: &str = r#"config {"vote_options":[0,0.5,1,2,3,5,8],"owner":"p1","me":"p1","room_creation_time":"2024-05-06 07:08:09"}"#;
    const USERS: &str = r#"users {"users":[{"pub_user_uuid":"p1","user_name":"Ann","role":"Voter","is_this":true,"is_active":true},{"pub_user_uuid":"p2","user_name":"Bob","role":"Voter","is_this":false,"is_active":true}]}"#;
    const STORIES: &str = r#"stories {"stories":[{"story_uuid":"s1","story":{"story_url":"https://t/1","story_description":"one "},"state":"Voting","votes":{"p1":{"Value":2},"p2":"Hidden"}},{"story_uuid":"s2","story":{"story_url":"https://t/2","story_description":""},"state":"Voting","votes":{}}],"active_story":"s1"}"#;

    fn identity() -> Identity {
        Identity {
            user_uuid: Uuid::nil(),
            user_name: "Ann".into(),
            role: Role::Voter,
        }
    }

    fn joined() -> (SyncedState<MockTransport, MockScheduler>, ConnectionId) {
        let connection =
            ConnectionManager::new(MockTransport::default(), MockScheduler::default());
        let mut synced = SyncedState::new(connection);
        let (address, _) = RoomAddress::from_page_url("http://h:15000/?room=r1").unwrap();
        synced.connect(&address, &identity());
        let id = synced.connection().transport().last_opened().unwrap();
        synced.handle_event(ConnectionEvent::Opened(id));
        for frame in [CONFIG, USERS, STORIES] {
            assert!(synced.handle_event(ConnectionEvent::Message(id, frame.into())));
        }
        (synced, id)
    }

    fn last_sent(synced: &SyncedState<MockTransport, MockScheduler>) -> &str {
        &synced.connection().transport().sent.last().unwrap().1
    }

    #[test]
    fn test_connects_with_identity() {
        let (synced, id) = joined();
        assert_eq!(
            synced.connection().transport().opened[0].1,
            "ws://h:15000/ws/00000000-0000-0000-0000-000000000000/r1"
        );
        assert_eq!(
            synced.connection().transport().sent_on(id)[0],
            r#"user {"user_name":"Ann","role":"Voter"}"#
        );
    }

    #[test]
    fn test_snapshots_applied() {
        let (synced, _) = joined();
        let room = synced.room();

        assert_eq!(room.users.len(), 2);
        assert_eq!(room.stories.len(), 2);
        assert_eq!(room.selection.selected, Some(StoryId::from("s1")));
        assert!(room.is_owner());
        assert!(room.has_hidden_vote());
        assert_eq!(room.consensus(), Some(2.0));
        assert_eq!(room.my_vote(), Some(&Vote::Numeric(2.0)));
    }

    #[test]
    fn test_one_publish_per_frame() {
        let (mut synced, id) = joined();
        let mut rx = synced.subscribe();
        assert!(!rx.has_changed().unwrap());

        synced.handle_event(ConnectionEvent::Message(id, r#"users {"users":[]}"#.into()));
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert!(seen.users.is_empty());
        assert_eq!(seen.stories.len(), 2);

        // Unknown verbs and malformed frames publish nothing
        assert!(!synced.handle_event(ConnectionEvent::Message(id, "chat {}".into())));
        assert!(!synced.handle_event(ConnectionEvent::Message(id, "stories [".into())));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_local_selection_survives_same_broadcast() {
        let (mut synced, id) = joined();
        synced.select_story("s2".into());

        synced.handle_event(ConnectionEvent::Message(id, STORIES.into()));
        assert_eq!(synced.room().selection.selected, Some(StoryId::from("s2")));
    }

    #[test]
    fn test_vote_and_owner_commands() {
        let (mut synced, _) = joined();

        synced.vote(Vote::Numeric(5.0)).unwrap();
        assert_eq!(last_sent(&synced), r#"vote {"story_uuid":"s1","vote":{"Value":5.0}}"#);

        synced.vote(Vote::Coffee).unwrap();
        assert_eq!(last_sent(&synced), r#"vote {"story_uuid":"s1","vote":"Coffee"}"#);

        synced.flip().unwrap();
        assert_eq!(last_sent(&synced), r#"flip {"story_uuid":"s1"}"#);

        synced.select_story("s2".into());
        synced.set_active_story().unwrap();
        assert_eq!(last_sent(&synced), r#"active_story {"story_uuid":"s2"}"#);

        synced.remove_story().unwrap();
        assert_eq!(last_sent(&synced), r#"remove_story {"story_uuid":"s2"}"#);
    }

    #[test]
    fn test_hidden_vote_rejected() {
        let (mut synced, _) = joined();
        let before = synced.connection().transport().sent.len();

        assert!(synced.vote(Vote::Hidden).is_err());
        assert_eq!(synced.connection().transport().sent.len(), before);
    }

    #[test]
    fn test_commands_need_selection() {
        let connection =
            ConnectionManager::new(MockTransport::default(), MockScheduler::default());
        let mut synced = SyncedState::new(connection);

        assert!(matches!(synced.flip(), Err(Error::NoStorySelected)));
        assert!(matches!(synced.vote(Vote::Question), Err(Error::NoStorySelected)));
        assert!(matches!(synced.remove_story(), Err(Error::NoStorySelected)));
    }

    #[test]
    fn test_finish_restricted_to_vote_options() {
        let (mut synced, _) = joined();

        assert!(matches!(synced.finish_voting(4.0), Err(Error::NotAVoteOption(v)) if v == 4.0));
        synced.finish_voting(0.5).unwrap();
        assert_eq!(last_sent(&synced), r#"finish {"story_uuid":"s1","final_vote":0.5}"#);
    }

    #[test]
    fn test_finish_from_draft() {
        let (mut synced, _) = joined();
        synced.set_dialog(Dialog::FinishVoting, true);

        assert!(synced.set_final_vote_draft("8"));
        assert!(!synced.set_final_vote_draft("8x"));
        assert_eq!(synced.room().drafts.final_vote_text, "8");

        synced.finish_voting_from_draft().unwrap();
        assert_eq!(last_sent(&synced), r#"finish {"story_uuid":"s1","final_vote":8.0}"#);
        assert!(synced.room().drafts.final_vote_text.is_empty());
        assert!(!synced.room().is_dialog_open(Dialog::FinishVoting));

        assert!(matches!(
            synced.finish_voting_from_draft(),
            Err(Error::InvalidDraft(_))
        ));
    }

    #[test]
    fn test_submit_stories_draft() {
        let (mut synced, _) = joined();
        synced.set_dialog(Dialog::AddStories, true);
        synced.set_stories_draft("backlog https://t/3 login page https://t/4");

        assert_eq!(synced.submit_stories_draft().unwrap(), 2);
        assert_eq!(
            last_sent(&synced),
            r#"stories {"stories":[{"story_url":"https://t/3","story_description":"login page "},{"story_url":"https://t/4","story_description":""}]}"#
        );
        assert!(synced.room().drafts.stories_text.is_empty());
        assert!(!synced.room().is_dialog_open(Dialog::AddStories));
    }

    #[test]
    fn test_send_identity_updates_handshake() {
        let (mut synced, id) = joined();
        let mut renamed = identity();
        renamed.user_name = "Annie".into();
        renamed.role = Role::Watcher;

        synced.send_identity(&renamed).unwrap();
        let expected = r#"user {"user_name":"Annie","role":"Watcher"}"#;
        assert_eq!(last_sent(&synced), expected);

        synced.handle_event(ConnectionEvent::Closed(id));
        for timer in synced.connection_mut().scheduler_mut().advance(crate::RECONNECT_DELAY) {
            synced.handle_event(ConnectionEvent::TimerFired(timer));
        }
        let fresh = synced.connection().transport().last_opened().unwrap();
        synced.handle_event(ConnectionEvent::Opened(fresh));
        assert_eq!(synced.connection().transport().sent_on(fresh), vec![expected]);
    }

    #[test]
    fn test_finished_story_never_reverts() {
        let (mut synced, id) = joined();
        let finished = STORIES.replacen(r#""state":"Voting""#, r#""state":"Finished""#, 1);
        synced.handle_event(ConnectionEvent::Message(id, finished));
        assert_eq!(synced.room().stories[0].state, StoryState::Finished);

        synced.handle_event(ConnectionEvent::Message(id, STORIES.into()));
        assert_eq!(synced.room().stories[0].state, StoryState::Finished);
    }

    #[test]
    fn test_commands_dropped_while_disconnected() {
        let (mut synced, id) = joined();
        synced.handle_event(ConnectionEvent::Closed(id));
        let before = synced.connection().transport().sent.len();

        synced.flip().unwrap();
        assert_eq!(synced.connection().transport().sent.len(), before);
    }
}
