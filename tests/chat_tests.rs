// End-to-end chat flow through the stub broker


use async_trait::async_trait;
use streamcli::chat::provider::{Joke, JokeProvider, ProviderError};
use streamcli::chat::{ChatReader, ChatWriter, Message, StreamManager};
use test_utils::spawn_broker;

struct NoJokes;

#[async_trait]
impl JokeProvider for NoJokes {
    async fn random_joke(&self) -> Result<Joke, ProviderError> {
        Err(ProviderError::EmptyBatch)
    }
}

#[tokio::test]
async fn greet_from_one_client_resolves_in_another() {
    let broker = spawn_broker().await;
    let manager = StreamManager::new(&broker.url());

    manager.create_scope("scope").await.unwrap();
    manager.create_stream("scope", "stream", 2).await.unwrap();

    let reader = manager
        .create_reader("scope", "stream", "tim", "tim")
        .await
        .unwrap();
    let mut tim = ChatReader::new(reader, NoJokes, "tim");

    let writer = manager.create_writer("scope", "stream").await.unwrap();
    let mut alex = ChatWriter::new(writer, "alex");

    alex.write("greet").await.unwrap();

    let response = tim.read().await.unwrap().unwrap();
    assert_eq!(response, Message::new("alex", "alex says hi!"));

    tim.close().await.unwrap();
}

#[tokio::test]
async fn plain_chat_lines_pass_through_between_clients() {
    let broker = spawn_broker().await;
    let manager = StreamManager::new(&broker.url());

    let reader = manager
        .create_reader("scope", "stream", "tim", "tim")
        .await
        .unwrap();
    let mut tim = ChatReader::new(reader, NoJokes, "tim");

    let writer = manager.create_writer("scope", "stream").await.unwrap();
    let mut alex = ChatWriter::new(writer, "alex");

    alex.write("hello there").await.unwrap();

    let response = tim.read().await.unwrap().unwrap();
    assert_eq!(response, Message::new("alex", "hello there"));
}

#[tokio::test]
async fn own_messages_are_filtered_through_the_full_path() {
    let broker = spawn_broker().await;
    let manager = StreamManager::new(&broker.url());

    let reader = manager
        .create_reader("scope", "stream", "tim", "tim")
        .await
        .unwrap();
    let mut tim_reader = ChatReader::new(reader, NoJokes, "tim");

    let writer = manager.create_writer("scope", "stream").await.unwrap();
    let mut tim_writer = ChatWriter::new(writer, "tim");

    tim_writer.write("greet").await.unwrap();

    // The slice arrives, decodes, and is suppressed as self-echo.
    assert!(tim_reader.read().await.unwrap().is_none());
}
