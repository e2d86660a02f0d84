// Chat session: one read loop, one write loop, one cancellation signal

use std::io::Write as _;

use futures::future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::chat::broker::{EventWriter, SliceReader};
use crate::chat::message::Message;
use crate::chat::provider::JokeProvider;
use crate::chat::reader::ChatReader;
use crate::chat::writer::ChatWriter;

/// A running chat session over one shared stream.
///
/// The two loops share no state beyond the cancellation token. Each one
/// paces itself against its own blocking source: the broker read call and
/// the console, respectively.
pub struct Chatter<R, P, W> {
    reader: ChatReader<R, P>,
    writer: ChatWriter<W>,
    id: String,
    token: CancellationToken,
}

impl<R, P, W> Chatter<R, P, W>
where
    R: SliceReader + Send + Sync + 'static,
    P: JokeProvider + Send + Sync + 'static,
    W: EventWriter + Send + 'static,
{
    pub fn new(reader: ChatReader<R, P>, writer: ChatWriter<W>, id: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            id: id.into(),
            token: CancellationToken::new(),
        }
    }

    /// Clone of the session's cancellation token. Cancelling it asks both
    /// loops to stop at their next iteration boundary.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run both loops until the session is cancelled or the console closes.
    pub async fn chat(self) {
        let Chatter {
            reader,
            writer,
            id,
            token,
        } = self;

        let read_task = tokio::spawn(read_loop(reader, id.clone(), token.clone()));
        let console = BufReader::new(tokio::io::stdin());
        let write_task = tokio::spawn(write_loop(writer, console, id, token));

        let (read_result, write_result) = future::join(read_task, write_task).await;
        for result in [read_result, write_result] {
            if let Err(e) = result {
                error!("chat task failed: {e}");
            }
        }
    }
}

/// Tail the stream until cancelled, printing every resolved response.
///
/// The token is only observed between reads; an in-flight blocking read is
/// allowed to finish, so shutdown latency is one pending read cycle.
async fn read_loop<R, P>(mut reader: ChatReader<R, P>, id: String, token: CancellationToken)
where
    R: SliceReader + Send + Sync,
    P: JokeProvider + Send + Sync,
{
    while !token.is_cancelled() {
        match reader.read().await {
            Ok(Some(response)) => render_response(&id, &response),
            Ok(None) => {}
            Err(e) => error!("read cycle failed: {e}"),
        }
    }

    // Release the reader's group membership exactly once on the way out.
    if let Err(e) = reader.close().await {
        warn!("failed to take reader offline: {e}");
    }
}

/// Prompt for console lines until cancelled or the console closes.
///
/// Input is trimmed and lower-cased before publishing; empty lines are
/// skipped. Publish failures are logged and the prompt continues.
async fn write_loop<W, I>(
    mut writer: ChatWriter<W>,
    mut console: I,
    id: String,
    token: CancellationToken,
) where
    W: EventWriter + Send,
    I: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    while !token.is_cancelled() {
        print_prompt(&id);
        line.clear();

        match console.read_line(&mut line).await {
            Ok(0) => break, // console closed
            Ok(_) => {
                let text = line.trim().to_lowercase();
                if text.is_empty() {
                    continue;
                }
                if let Err(e) = writer.write(&text).await {
                    warn!("failed to publish message: {e}");
                }
            }
            Err(e) => {
                error!("failed to read console input: {e}");
                break;
            }
        }
    }
}

/// Backspace over the pending prompt so incoming messages appear to scroll
/// above the input line, then re-enter the prompt.
fn render_response(id: &str, response: &Message) {
    print!("{}", "\u{8}".repeat(id.len() + 2));
    println!("{}: {}\n", response.sender, response.message);
    print!("{id}: ");
    std::io::stdout().flush().ok();
}

fn print_prompt(id: &str) {
    println!();
    print!("{id}: ");
    std::io::stdout().flush().ok();
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::chat::broker::BrokerError;
    use crate::chat::provider::{Joke, ProviderError};

    struct NoJokes;

    #[async_trait]
    impl JokeProvider for NoJokes {
        async fn random_joke(&self) -> Result<Joke, ProviderError> {
            Err(ProviderError::EmptyBatch)
        }
    }

    /// Reader that cancels the shared token from inside its first read,
    /// modelling a shutdown that lands while a read is in flight.
    struct CancellingReader {
        token: CancellationToken,
        reads: Arc<AtomicUsize>,
        offline: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SliceReader for CancellingReader {
        async fn next_slice(&mut self) -> Result<Vec<Vec<u8>>, BrokerError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.token.cancel();
            Ok(vec![])
        }

        async fn release_slice(&mut self) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn reader_offline(&mut self) -> Result<(), BrokerError> {
            self.offline.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Writer that records published payloads behind a shared handle, so
    /// tests can inspect them after the loop consumes the writer.
    #[derive(Default, Clone)]
    struct CapturingWriter {
        events: Arc<std::sync::Mutex<Vec<Vec<u8>>>>,
    }

    impl CapturingWriter {
        fn published(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|bytes| String::from_utf8(bytes.clone()).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl EventWriter for CapturingWriter {
        async fn write_event(&mut self, payload: Vec<u8>) -> Result<(), BrokerError> {
            self.events.lock().unwrap().push(payload);
            Ok(())
        }
    }

    struct CountingFailWriter {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventWriter for CountingFailWriter {
        async fn write_event(&mut self, _payload: Vec<u8>) -> Result<(), BrokerError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(BrokerError::Disconnected)
        }
    }

    #[tokio::test]
    async fn cancelled_read_loop_never_starts_another_read() {
        let token = CancellationToken::new();
        token.cancel();

        let reads = Arc::new(AtomicUsize::new(0));
        let offline = Arc::new(AtomicUsize::new(0));
        let reader = CancellingReader {
            token: token.clone(),
            reads: reads.clone(),
            offline: offline.clone(),
        };

        let chat_reader = ChatReader::new(reader, NoJokes, "tim");
        read_loop(chat_reader, "tim".to_string(), token).await;

        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(offline.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_loop_finishes_the_in_flight_read_then_stops() {
        let token = CancellationToken::new();
        let reads = Arc::new(AtomicUsize::new(0));
        let offline = Arc::new(AtomicUsize::new(0));
        let reader = CancellingReader {
            token: token.clone(),
            reads: reads.clone(),
            offline: offline.clone(),
        };

        let chat_reader = ChatReader::new(reader, NoJokes, "tim");
        read_loop(chat_reader, "tim".to_string(), token).await;

        // One read was in flight when the token flipped; no second read, and
        // the broker reader is released exactly once.
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(offline.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn write_loop_normalizes_input_and_skips_empty_lines() {
        let token = CancellationToken::new();
        let console = BufReader::new(&b"  HeLLo World \n\n   \njoke\n"[..]);
        let capture = CapturingWriter::default();
        let writer = ChatWriter::new(capture.clone(), "tim");

        write_loop(writer, console, "tim".to_string(), token).await;

        assert_eq!(
            capture.published(),
            vec![
                r#"{"sender":"tim","message":"hello world"}"#.to_string(),
                r#"{"sender":"tim","message":"joke"}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn write_loop_survives_publish_failures() {
        let token = CancellationToken::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let console = BufReader::new(&b"one\ntwo\n"[..]);
        let writer = ChatWriter::new(
            CountingFailWriter {
                attempts: attempts.clone(),
            },
            "tim",
        );

        write_loop(writer, console, "tim".to_string(), token).await;

        // Both lines were attempted; the first failure did not end the loop.
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancelled_write_loop_stops_without_reading() {
        let token = CancellationToken::new();
        token.cancel();

        let console = BufReader::new(&b"never sent\n"[..]);
        let capture = CapturingWriter::default();
        let writer = ChatWriter::new(capture.clone(), "tim");

        write_loop(writer, console, "tim".to_string(), token).await;

        assert!(capture.published().is_empty());
    }
}
