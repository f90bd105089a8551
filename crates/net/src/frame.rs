//! Verb-prefixed text frames
//!
//! Wire format: `<verb> <json payload>`, split at the first space.
//! The keepalive frame `ping` carries no payload.

use serde::Serialize;

use crate::error::{Error, Result};

/// A frame split into its verb and raw payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub verb: &'a str,
    pub payload: &'a str,
}

/// Split a text frame at the first space. A frame without a space is all verb.
pub fn split_frame(text: &str) -> Frame<'_> {
    match text.split_once(' ') {
        Some((verb, payload)) => Frame { verb, payload },
        None => Frame {
            verb: text.trim_end(),
            payload: "",
        },
    }
}

/// Serialize `payload` behind `verb`
pub fn encode_frame<T: Serialize>(verb: &'static str, payload: &T) -> Result<String> {
    let json = serde_json::to_string(payload).map_err(|source| Error::Encode { verb, source })?;
    Ok(format!("{} {}", verb, json))
}
