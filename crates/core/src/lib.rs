//! Ballot Core Library
//!
//! Domain models, the local room mirror, derived computations and identity
//! persistence for the Ballot planning-poker client.

pub mod aggregate;
pub mod error;
pub mod models;
pub mod parser;
pub mod permissions;
pub mod state;
pub mod storage;

pub use error::{Error, Result};
pub use models::*;
pub use parser::parse_story_list;
pub use permissions::{PermissionMatrix, RoomAction};
pub use state::{Dialog, Dialogs, Drafts, LocalSelection, RoomState};
pub use storage::{Database, IdentityStore, LocalStorage};
