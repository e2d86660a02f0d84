// Chat client built atop an external durable stream broker
//
// The broker owns durability, partitioning, offsets, and reader-group
// coordination. This module only formats envelopes, filters self-echo,
// resolves the two built-in commands, and drives the console loops.

pub mod broker;
pub mod chatter;
pub mod cli;
pub mod message;
pub mod provider;
pub mod reader;
pub mod writer;

pub use broker::{BrokerError, EventWriter, SliceReader, StreamManager, StreamReader, StreamWriter};
pub use chatter::Chatter;
pub use cli::Cli;
pub use message::{DecodeError, Message};
pub use provider::{HttpJokeProvider, Joke, JokeProvider, ProviderError};
pub use reader::{ChatError, ChatReader};
pub use writer::ChatWriter;
