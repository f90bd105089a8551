//! Data models for Ballot

mod identity;
mod room;
mod story;
mod vote;

pub use identity::*;
pub use room::*;
pub use story::*;
pub use vote::*;
