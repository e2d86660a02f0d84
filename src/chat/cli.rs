// Command-line surface for the chat client

use clap::Parser;

/// Terminal chat over a shared durable stream.
///
/// Connects to the broker at URL, provisions the chat stream if needed,
/// and joins the conversation as ID. Runs until interrupted; Ctrl+C asks
/// both loops to finish their current cycle and exit.
#[derive(Debug, Parser)]
#[command(name = "streamcli", version, about, long_about = None)]
pub struct Cli {
    /// Broker endpoint, e.g. tcp://127.0.0.1:9090
    pub url: String,

    /// Unique chat identifier; also names this client's reader
    pub id: String,

    /// High verbosity (debug-level logging)
    #[arg(long)]
    pub verbose: bool,
}
