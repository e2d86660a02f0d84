// Broker client for the durable stream service
//
// The broker owns durability, partitioning, offsets, and reader-group
// coordination. This client only speaks the wire calls the chat loops
// consume: provision, publish, pull the next slice, release it, and take
// the reader offline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Errors surfaced by the broker client
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("i/o error talking to the broker: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed broker frame: {0}")]
    Frame(#[from] serde_json::Error),
    #[error("broker rejected the request: {0}")]
    Rejected(String),
    #[error("broker closed the connection")]
    Disconnected,
    #[error("unexpected broker response to {0}")]
    Unexpected(&'static str),
    #[error("event payload is not valid UTF-8")]
    NonUtf8Payload,
}

/// Requests sent to the broker, one JSON object per line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrokerRequest {
    /// Create a scope if it does not already exist
    CreateScope { scope: String },
    /// Create a stream with a fixed segment count if it does not exist
    CreateStream {
        scope: String,
        stream: String,
        segments: u32,
    },
    /// Bind this connection as an event writer on a stream
    AttachWriter { scope: String, stream: String },
    /// Bind this connection as a named reader within a reader group
    AttachReader {
        scope: String,
        stream: String,
        group: String,
        reader: String,
    },
    /// Append one event to the stream
    Publish { event: String },
    /// Pull the next available slice of events (suspends until data)
    NextSlice,
    /// Release the slice so the group will not replay it to this reader
    ReleaseSlice,
    /// Take the reader offline, releasing its group membership
    ReaderOffline,
}

/// Responses from the broker, one JSON object per line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrokerResponse {
    Ack,
    Slice { events: Vec<String> },
    Error { message: String },
}

impl BrokerRequest {
    /// Serialize to JSON bytes with a newline delimiter
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl BrokerResponse {
    /// Serialize to JSON bytes with a newline delimiter
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Pull side of the broker boundary consumed by the read loop
#[async_trait]
pub trait SliceReader {
    /// Next batch of event payload fragments; suspends until data arrives
    async fn next_slice(&mut self) -> Result<Vec<Vec<u8>>, BrokerError>;
    /// Release the slice back to the reader group
    async fn release_slice(&mut self) -> Result<(), BrokerError>;
    /// Release this reader's group membership
    async fn reader_offline(&mut self) -> Result<(), BrokerError>;
}

/// Push side of the broker boundary consumed by the write loop
#[async_trait]
pub trait EventWriter {
    /// Append one serialized envelope to the stream
    async fn write_event(&mut self, payload: Vec<u8>) -> Result<(), BrokerError>;
}

/// One line-framed request/response connection to the broker
struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl Connection {
    async fn open(addr: &str) -> Result<Self, BrokerError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            line: String::new(),
        })
    }

    /// Send one request and wait for the broker's reply. Broker-reported
    /// errors come back as [`BrokerError::Rejected`].
    async fn roundtrip(&mut self, request: &BrokerRequest) -> Result<BrokerResponse, BrokerError> {
        let bytes = request.to_bytes()?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;

        self.line.clear();
        let read = self.reader.read_line(&mut self.line).await?;
        if read == 0 {
            return Err(BrokerError::Disconnected);
        }

        match BrokerResponse::from_bytes(self.line.trim_end().as_bytes())? {
            BrokerResponse::Error { message } => Err(BrokerError::Rejected(message)),
            response => Ok(response),
        }
    }

    async fn expect_ack(
        &mut self,
        request: &BrokerRequest,
        what: &'static str,
    ) -> Result<(), BrokerError> {
        match self.roundtrip(request).await? {
            BrokerResponse::Ack => Ok(()),
            _ => Err(BrokerError::Unexpected(what)),
        }
    }
}

/// Entry point to the broker, mirroring its provisioning surface.
///
/// Control calls use short-lived connections; writers and readers each hold
/// their own connection so the two chat loops never share a socket.
pub struct StreamManager {
    addr: String,
}

impl StreamManager {
    /// Address the broker listens on, accepting the `tcp://host:port` form
    pub fn new(url: &str) -> Self {
        let addr = url.strip_prefix("tcp://").unwrap_or(url).to_string();
        Self { addr }
    }

    /// Create a scope; a no-op on the broker side if it already exists
    pub async fn create_scope(&self, scope: &str) -> Result<(), BrokerError> {
        let mut conn = Connection::open(&self.addr).await?;
        conn.expect_ack(
            &BrokerRequest::CreateScope {
                scope: scope.to_string(),
            },
            "create_scope",
        )
        .await
    }

    /// Create a stream; a no-op on the broker side if it already exists
    pub async fn create_stream(
        &self,
        scope: &str,
        stream: &str,
        segments: u32,
    ) -> Result<(), BrokerError> {
        let mut conn = Connection::open(&self.addr).await?;
        conn.expect_ack(
            &BrokerRequest::CreateStream {
                scope: scope.to_string(),
                stream: stream.to_string(),
                segments,
            },
            "create_stream",
        )
        .await
    }

    /// Attach an event writer to a stream
    pub async fn create_writer(
        &self,
        scope: &str,
        stream: &str,
    ) -> Result<StreamWriter, BrokerError> {
        let mut conn = Connection::open(&self.addr).await?;
        conn.expect_ack(
            &BrokerRequest::AttachWriter {
                scope: scope.to_string(),
                stream: stream.to_string(),
            },
            "attach_writer",
        )
        .await?;
        Ok(StreamWriter { conn })
    }

    /// Attach a named reader within a reader group
    pub async fn create_reader(
        &self,
        scope: &str,
        stream: &str,
        group: &str,
        reader: &str,
    ) -> Result<StreamReader, BrokerError> {
        let mut conn = Connection::open(&self.addr).await?;
        conn.expect_ack(
            &BrokerRequest::AttachReader {
                scope: scope.to_string(),
                stream: stream.to_string(),
                group: group.to_string(),
                reader: reader.to_string(),
            },
            "attach_reader",
        )
        .await?;
        Ok(StreamReader { conn })
    }
}

/// Writer half of the broker client
pub struct StreamWriter {
    conn: Connection,
}

#[async_trait]
impl EventWriter for StreamWriter {
    async fn write_event(&mut self, payload: Vec<u8>) -> Result<(), BrokerError> {
        let event = String::from_utf8(payload).map_err(|_| BrokerError::NonUtf8Payload)?;
        self.conn
            .expect_ack(&BrokerRequest::Publish { event }, "publish")
            .await
    }
}

/// Reader half of the broker client
pub struct StreamReader {
    conn: Connection,
}

#[async_trait]
impl SliceReader for StreamReader {
    async fn next_slice(&mut self) -> Result<Vec<Vec<u8>>, BrokerError> {
        match self.conn.roundtrip(&BrokerRequest::NextSlice).await? {
            BrokerResponse::Slice { events } => {
                Ok(events.into_iter().map(String::into_bytes).collect())
            }
            _ => Err(BrokerError::Unexpected("next_slice")),
        }
    }

    async fn release_slice(&mut self) -> Result<(), BrokerError> {
        self.conn
            .expect_ack(&BrokerRequest::ReleaseSlice, "release_slice")
            .await
    }

    async fn reader_offline(&mut self) -> Result<(), BrokerError> {
        self.conn
            .expect_ack(&BrokerRequest::ReaderOffline, "reader_offline")
            .await
    }
}
