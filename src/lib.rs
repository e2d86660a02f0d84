//! streamcli - a minimal terminal chat client over a durable stream broker
//!
//! Chat lines travel as two-field JSON envelopes on a shared stream. Each
//! client tails the same stream it publishes to, suppressing its own echoes
//! and resolving the `greet` and `joke` commands on behalf of the sender.

pub mod chat;

pub use chat::{ChatReader, ChatWriter, Chatter, Message};
