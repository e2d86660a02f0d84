// Wire envelope for chat events on the stream

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to turn raw event bytes into a [`Message`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload was not valid UTF-8 text
    #[error("event payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The payload was not a well-formed envelope (bad JSON, a missing key,
    /// or an unknown key)
    #[error("event payload is not a valid envelope: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single chat line as it travels on the stream.
///
/// Exactly two keys, both required. Decoding is strict: an event carrying
/// extra keys is rejected rather than silently accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    /// Identifier of the client that published the event
    pub sender: String,
    /// Chat line content
    pub message: String,
}

impl Message {
    /// Create a new message
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
        }
    }

    /// Serialize to JSON bytes, values verbatim
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(serde_json::from_str(text)?)
    }
}
