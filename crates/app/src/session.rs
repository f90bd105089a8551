//! Console session: routes intents to the synced room and persists identity
//! changes

use ballot_core::{Dialog, Identity, IdentityStore, Role};
use ballot_net::{ConnectionEvent, Scheduler, SyncedState, Transport};
use tracing::info;

use crate::console::{render, resolve_story, Intent, HELP};
use crate::error::{AppError, Result};

/// What the console should do after an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Silent,
    Message(String),
    Render,
    Quit,
}

pub struct Session<T, S, D> {
    synced: SyncedState<T, S>,
    identity: Identity,
    store: D,
}

impl<T: Transport, S: Scheduler, D: IdentityStore> Session<T, S, D> {
    pub fn new(synced: SyncedState<T, S>, identity: Identity, store: D) -> Self {
        Self {
            synced,
            identity,
            store,
        }
    }

    #[cfg(test)]
    pub fn synced(&self) -> &SyncedState<T, S> {
        &self.synced
    }

    pub fn render(&self) -> String {
        render(&self.synced.room(), self.synced.connection().state())
    }

    /// Feed a connection event. Returns whether the view is stale.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> bool {
        let before = self.synced.connection().state();
        let changed = self.synced.handle_event(event);
        let after = self.synced.connection().state();
        if before != after {
            info!(from = ?before, to = ?after, "Connection state changed");
        }
        changed || before != after
    }

    pub fn execute(&mut self, intent: Intent) -> Result<Reply> {
        let reply = match intent {
            Intent::Name(name) => {
                self.identity.user_name = name;
                self.update_identity()?;
                Reply::Message(format!("Name set to {}", self.identity.user_name))
            }
            Intent::Role(role) => {
                self.identity.role = role;
                self.update_identity()?;
                let note = match role {
                    Role::Voter => "you will be asked to vote",
                    Role::Watcher => "you will only watch",
                };
                Reply::Message(format!("Role set to {}, {}", role, note))
            }
            Intent::Add(text) => {
                self.synced.set_dialog(Dialog::AddStories, true);
                self.synced.set_stories_draft(text);
                match self.synced.submit_stories_draft()? {
                    0 => Reply::Message("No story urls found".to_string()),
                    count => Reply::Message(format!("Submitted {} stories", count)),
                }
            }
            Intent::Select(arg) => {
                let id = resolve_story(&self.synced.room(), &arg)
                    .ok_or_else(|| AppError::Usage(format!("no story '{}'", arg)))?;
                self.synced.select_story(id);
                Reply::Render
            }
            Intent::Vote(vote) => {
                self.synced.vote(vote)?;
                Reply::Message(format!("Voted {}", vote))
            }
            Intent::Final(text) => {
                self.synced.set_dialog(Dialog::FinishVoting, true);
                if !self.synced.set_final_vote_draft(&text) {
                    return Err(AppError::Usage(format!("'{}' is not a number", text)));
                }
                Reply::Message(format!("Final estimate draft: {}", text))
            }
            Intent::Finish => {
                self.synced.finish_voting_from_draft()?;
                Reply::Message("Finishing story".to_string())
            }
            Intent::Flip => {
                self.synced.flip()?;
                Reply::Silent
            }
            Intent::Activate => {
                self.synced.set_active_story()?;
                Reply::Silent
            }
            Intent::Remove => {
                self.synced.remove_story()?;
                Reply::Silent
            }
            Intent::Reconnect => {
                self.synced.connection_mut().reconnect();
                Reply::Message("Reconnecting".to_string())
            }
            Intent::Show => Reply::Render,
            Intent::Help => Reply::Message(HELP.to_string()),
            Intent::Quit => Reply::Quit,
        };
        Ok(reply)
    }

    fn update_identity(&mut self) -> Result<()> {
        self.store.save(&self.identity)?;
        self.synced.send_identity(&self.identity)?;
        Ok(())
    }
}
