// Outbound formatting: wrap local text in the envelope and publish it

use crate::chat::broker::EventWriter;
use crate::chat::message::Message;
use crate::chat::reader::ChatError;

/// Publishes this client's chat lines onto the shared stream
pub struct ChatWriter<W> {
    writer: W,
    id: String,
}

impl<W: EventWriter> ChatWriter<W> {
    pub fn new(writer: W, id: impl Into<String>) -> Self {
        Self {
            writer,
            id: id.into(),
        }
    }

    /// Wrap local text in the wire envelope, sender set to this client
    fn format_message(&self, text: &str) -> Result<Vec<u8>, serde_json::Error> {
        Message::new(self.id.clone(), text).to_bytes()
    }

    /// Publish one chat line. Callers skip empty input before getting here.
    pub async fn write(&mut self, text: &str) -> Result<(), ChatError> {
        let payload = self.format_message(text)?;
        Ok(self.writer.write_event(payload).await?)
    }
}
