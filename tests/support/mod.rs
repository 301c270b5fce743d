// Shared server bootstrap and websocket helpers for integration tests.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        // Local one-time slot where the server thread publishes its selected URL.
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                // Worlds are read from the bundled `worlds/` directory.
                realm_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    // Strip the scheme so we can use host:port for raw TCP readiness checks.
    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

/// A username no other test uses.
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}

pub async fn connect() -> Client {
    let url = format!("{}/ws", ensure_server().replace("http://", "ws://"));
    let (client, _response) = connect_async(url).await.expect("websocket connect");
    client
}

/// Opens a connection, sends the username handshake and waits for the `world|` frame.
pub async fn join(username: &str) -> (Client, serde_json::Value) {
    let mut client = connect().await;
    client
        .send(Message::text(username.to_string()))
        .await
        .expect("send username");
    let frame = recv_prefixed(&mut client, "world|").await;
    let world = serde_json::from_str(&frame["world|".len()..]).expect("world json");
    (client, world)
}

pub async fn send(client: &mut Client, frame: &str) {
    client
        .send(Message::text(frame.to_string()))
        .await
        .expect("send frame");
}

/// Next message of any kind, failing the test if none arrives in time.
pub async fn next_message(client: &mut Client) -> Message {
    tokio::time::timeout(RECV_TIMEOUT, client.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("websocket error")
}

/// Skips frames until one starts with `prefix`.
pub async fn recv_prefixed(client: &mut Client, prefix: &str) -> String {
    loop {
        match next_message(client).await {
            Message::Text(text) if text.starts_with(prefix) => return String::from(&*text),
            Message::Close(frame) => panic!("closed while waiting for {prefix}: {frame:?}"),
            _ => {}
        }
    }
}

/// Waits for the close frame and returns its code and reason.
pub async fn recv_close(client: &mut Client) -> (u16, String) {
    loop {
        if let Message::Close(frame) = next_message(client).await {
            let frame = frame.expect("close frame with a reason");
            return (u16::from(frame.code), String::from(&*frame.reason));
        }
    }
}
