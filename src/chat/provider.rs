// External joke lookup behind the "joke" command

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Batch endpoint of the public joke API
pub const JOKE_ENDPOINT: &str = "https://official-joke-api.appspot.com/random_ten";

/// Failure to resolve a joke from the external provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("joke request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("joke provider returned an empty batch")]
    EmptyBatch,
}

/// A two-line joke as served by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct Joke {
    pub setup: String,
    pub punchline: String,
}

impl Joke {
    /// Newline-joined setup and punchline, ready to print as one chat line
    pub fn two_liner(&self) -> String {
        format!("{}\n{}", self.setup, self.punchline)
    }
}

/// One opaque remote lookup per "joke" command
#[async_trait]
pub trait JokeProvider {
    async fn random_joke(&self) -> Result<Joke, ProviderError>;
}

/// Fetches a batch of jokes over HTTP and takes the first entry.
///
/// Any transport failure, non-success status, or undecodable body
/// propagates as a [`ProviderError`]; there is no fallback joke.
pub struct HttpJokeProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpJokeProvider {
    pub fn new() -> Self {
        Self::with_endpoint(JOKE_ENDPOINT)
    }

    /// Point the provider at a different batch endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpJokeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JokeProvider for HttpJokeProvider {
    async fn random_joke(&self) -> Result<Joke, ProviderError> {
        let jokes: Vec<Joke> = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        jokes.into_iter().next().ok_or(ProviderError::EmptyBatch)
    }
}
