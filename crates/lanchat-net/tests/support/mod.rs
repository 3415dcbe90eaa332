//! Shared helpers for server/client integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use lanchat_core::protocol::envelope::MessageEnvelope;
use lanchat_core::protocol::messages::{ChatMessage, SystemMessage};
use lanchat_net::client::ChatClient;
use lanchat_net::config::{ClientConfig, ServerConfig};
use lanchat_net::events::{ClientEvent, ServerEvent};
use lanchat_net::server::ChatServer;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn loopback_config() -> ServerConfig {
    ServerConfig {
        listen: "127.0.0.1:0".into(),
        ..ServerConfig::default()
    }
}

pub async fn start_server() -> (ChatServer, mpsc::Receiver<ServerEvent>, SocketAddr) {
    let (server, events) = ChatServer::new(loopback_config()).unwrap();
    let addr = server.start().await.unwrap();
    (server, events, addr)
}

pub async fn connected_client(addr: SocketAddr) -> (ChatClient, mpsc::Receiver<ClientEvent>) {
    let (client, events) = ChatClient::new(ClientConfig::default()).unwrap();
    client.connect(addr).await.unwrap();
    (client, events)
}

/// Wait until the server's roster holds `n` clients. `connect()` returns
/// on TCP establishment, which can race the accept loop's roster insert.
pub async fn wait_for_clients(server: &ChatServer, n: usize) {
    timeout(EVENT_TIMEOUT, async {
        while server.client_count() < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for roster");
}

/// Next envelope received by a client, skipping other events.
pub async fn next_envelope(events: &mut mpsc::Receiver<ClientEvent>) -> MessageEnvelope {
    loop {
        let event = timeout(EVENT_TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for client event")
            .expect("client event channel closed");
        if let ClientEvent::EnvelopeReceived(envelope) = event {
            return envelope;
        }
    }
}

pub async fn next_system_message(events: &mut mpsc::Receiver<ClientEvent>) -> SystemMessage {
    loop {
        let envelope = next_envelope(events).await;
        if envelope.is(SystemMessage::TYPE_NAME) {
            return envelope.payload().unwrap();
        }
    }
}

pub async fn next_chat_message(events: &mut mpsc::Receiver<ClientEvent>) -> ChatMessage {
    loop {
        let envelope = next_envelope(events).await;
        if envelope.is(ChatMessage::TYPE_NAME) {
            return envelope.payload().unwrap();
        }
    }
}

pub async fn wait_for_disconnected(events: &mut mpsc::Receiver<ClientEvent>) {
    loop {
        let event = timeout(EVENT_TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for Disconnected")
            .expect("client event channel closed");
        if matches!(event, ClientEvent::Disconnected) {
            return;
        }
    }
}

/// Assert that no envelope arrives within `window`.
pub async fn assert_no_envelope(events: &mut mpsc::Receiver<ClientEvent>, window: Duration) {
    let unexpected = timeout(window, async {
        loop {
            match events.recv().await {
                Some(ClientEvent::EnvelopeReceived(envelope)) => return envelope,
                Some(_) => {}
                None => std::future::pending().await,
            }
        }
    })
    .await;
    assert!(
        unexpected.is_err(),
        "unexpected envelope: {:?}",
        unexpected.ok()
    );
}

/// Drain events for `window` and count the ChatMessages seen.
pub async fn count_chat_messages(
    events: &mut mpsc::Receiver<ClientEvent>,
    window: Duration,
) -> usize {
    let mut count = 0;
    let _ = timeout(window, async {
        loop {
            match events.recv().await {
                Some(ClientEvent::EnvelopeReceived(envelope))
                    if envelope.is(ChatMessage::TYPE_NAME) =>
                {
                    count += 1;
                }
                Some(_) => {}
                None => break,
            }
        }
    })
    .await;
    count
}
