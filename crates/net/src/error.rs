//! Network and synchronization error types

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Not connected")]
    NotConnected,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Malformed '{verb}' payload: {source}")]
    Decode {
        verb: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode '{verb}' command: {source}")]
    Encode {
        verb: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No story selected")]
    NoStorySelected,

    #[error("{0} is not one of the room's vote options")]
    NotAVoteOption(f64),

    #[error("Invalid draft: {0}")]
    InvalidDraft(String),
}
