// Inbound processing: one broker slice in, at most one response out

use thiserror::Error;
use tracing::debug;

use crate::chat::broker::{BrokerError, SliceReader};
use crate::chat::message::{DecodeError, Message};
use crate::chat::provider::{JokeProvider, ProviderError};

/// Any failure during one read/process cycle.
///
/// All of these are caught at the read-loop boundary, logged, and treated
/// as "no response this cycle". Never fatal, never retried.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error("failed to encode outbound envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Tails the shared stream and resolves incoming chat lines.
///
/// Recognizes two commands, `greet` and `joke`, akin to slash commands.
/// Anything else is echoed back as-is.
pub struct ChatReader<R, P> {
    reader: R,
    provider: P,
    id: String,
}

impl<R: SliceReader, P: JokeProvider> ChatReader<R, P> {
    pub fn new(reader: R, provider: P, id: impl Into<String>) -> Self {
        Self {
            reader,
            provider,
            id: id.into(),
        }
    }

    /// Pull the next slice from the broker and turn it into at most one
    /// outbound-ready response.
    pub async fn read(&mut self) -> Result<Option<Message>, ChatError> {
        let fragments = self.reader.next_slice().await?;
        // Once released, events in this slice will not be handed to readers
        // in the same group again.
        self.reader.release_slice().await?;

        if fragments.is_empty() {
            return Ok(None);
        }
        self.process_slice(&fragments).await
    }

    /// Decode a batch of raw byte fragments into one logical message and
    /// decide what to do with it.
    async fn process_slice(&self, fragments: &[Vec<u8>]) -> Result<Option<Message>, ChatError> {
        let mut text = String::new();
        for fragment in fragments {
            text.push_str(std::str::from_utf8(fragment).map_err(DecodeError::Utf8)?);
        }

        let normalized = text.trim().to_lowercase();
        let incoming = Message::from_bytes(normalized.as_bytes())?;
        debug!(sender = %incoming.sender, text = %incoming.message, "incoming event");

        // We are tailing the same stream we publish to, so skip our own
        // messages.
        if incoming.sender == self.id {
            return Ok(None);
        }

        let resolved = match incoming.message.as_str() {
            "greet" => greet(&incoming.sender),
            "joke" => self.provider.random_joke().await?.two_liner(),
            _ => incoming.message.clone(),
        };

        // Responses carry the original sender's name, not ours.
        Ok(Some(Message::new(incoming.sender, resolved)))
    }

    /// Take the reader offline so the broker does not track a dangling
    /// group member.
    pub async fn close(&mut self) -> Result<(), BrokerError> {
        self.reader.reader_offline().await
    }
}

fn greet(sender: &str) -> String {
    format!("{sender} says hi!")
}
