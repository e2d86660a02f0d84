//! streamcli - terminal chat over a durable stream broker
//!
//! Bootstraps the broker connection, provisions the shared scope and
//! stream, and runs the interactive chat session until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use streamcli::chat::{ChatReader, ChatWriter, Chatter, Cli, HttpJokeProvider, StreamManager};

// Scope and stream shared by every chat participant. Provisioning is
// idempotent on the broker side, so each client re-issues it at startup.
const SCOPE: &str = "scope";
const STREAM: &str = "stream";
const SEGMENTS: u32 = 2;

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let manager = StreamManager::new(&cli.url);
    manager
        .create_scope(SCOPE)
        .await
        .context("failed to create chat scope")?;
    manager
        .create_stream(SCOPE, STREAM, SEGMENTS)
        .await
        .context("failed to create chat stream")?;

    let writer = manager
        .create_writer(SCOPE, STREAM)
        .await
        .context("failed to attach stream writer")?;
    let reader = manager
        .create_reader(SCOPE, STREAM, &cli.id, &cli.id)
        .await
        .context("failed to attach stream reader")?;

    let chatter = Chatter::new(
        ChatReader::new(reader, HttpJokeProvider::new(), cli.id.clone()),
        ChatWriter::new(writer, cli.id.clone()),
        cli.id,
    );

    // Ctrl+C flips the shared cancellation token; both loops observe it at
    // their next iteration boundary rather than being torn down mid-call.
    let shutdown = chatter.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install ctrl-c handler: {e}");
        }
        shutdown.cancel();
    });

    chatter.chat().await;
    Ok(())
}
