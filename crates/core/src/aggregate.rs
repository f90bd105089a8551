//! Values derived from the room mirror
//!
//! Everything here is a pure read of [`RoomState`]; presentation re-evaluates
//! these on every published change.

use crate::models::{PubUserId, Story, User, Vote};
use crate::state::RoomState;

/// Round to one decimal place
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Root-mean-square of the numeric votes, rounded to one decimal.
///
/// Sentinel votes are skipped. `None` when no numeric vote exists.
pub fn consensus<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Option<f64> {
    let (count, sum_of_squares) = votes
        .into_iter()
        .filter_map(Vote::numeric)
        .fold((0usize, 0.0f64), |(count, sum), value| {
            (count + 1, sum + value * value)
        });

    if count == 0 {
        return None;
    }
    Some(round_to_tenth((sum_of_squares / count as f64).sqrt()))
}

/// True iff at least one vote is the concealed sentinel
pub fn has_hidden_vote<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> bool {
    votes.into_iter().any(Vote::is_hidden)
}

impl RoomState {
    /// The story whose id matches the local selection
    pub fn active_story(&self) -> Option<&Story> {
        let selected = self.selection.selected.as_ref()?;
        self.find_story(selected)
    }

    /// Consensus over the active story's votes
    pub fn consensus(&self) -> Option<f64> {
        consensus(self.active_story()?.votes.values())
    }

    /// Whether the active story has any concealed vote
    pub fn has_hidden_vote(&self) -> bool {
        self.active_story()
            .map(|story| has_hidden_vote(story.votes.values()))
            .unwrap_or(false)
    }

    /// This client's server-issued public id
    pub fn my_id(&self) -> Option<&PubUserId> {
        self.config.as_ref().map(|config| &config.me)
    }

    /// This client's vote on the active story
    pub fn my_vote(&self) -> Option<&Vote> {
        let me = self.my_id()?;
        self.active_story()?.vote_of(me)
    }

    /// This client's roster entry
    pub fn me(&self) -> Option<&User> {
        let my_id = self.my_id();
        self.users
            .iter()
            .find(|user| user.is_self || Some(&user.id) == my_id)
    }

    /// Connected participants with the Voter role
    pub fn voters(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter(|user| user.is_voting())
    }

    /// Voters that have not voted on the active story yet
    pub fn pending_voters(&self) -> Vec<&User> {
        let Some(story) = self.active_story() else {
            return Vec::new();
        };
        self.voters()
            .filter(|user| !story.votes.contains_key(&user.id))
            .collect()
    }
}
