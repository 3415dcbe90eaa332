//! End-to-end server/client scenarios.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::sync::Arc;
use std::time::Duration;

use lanchat_core::protocol::envelope::MessageEnvelope;
use lanchat_core::protocol::messages::{
    DiscoveryRequest, DiscoveryResponse, Login, SystemMessage,
};
use lanchat_net::server::ChatServer;
use lanchat_net::transform::DiscoveryResponder;

use support::*;

#[tokio::test]
async fn login_broadcasts_join_announcement_and_never_the_login_itself() {
    let (server, _server_events, addr) = start_server().await;

    let (_observer, mut observer_events) = connected_client(addr).await;
    let (alice, mut alice_events) = connected_client(addr).await;
    wait_for_clients(&server, 2).await;

    alice.login("alice").await.unwrap();

    // The first envelope anyone sees is the join announcement; the Login
    // envelope itself must not be re-broadcast.
    let envelope = next_envelope(&mut observer_events).await;
    assert!(
        !envelope.is(Login::TYPE_NAME),
        "Login envelope was re-broadcast"
    );
    assert!(envelope.is(SystemMessage::TYPE_NAME));
    let announcement: SystemMessage = envelope.payload().unwrap();
    assert_eq!(announcement.text, "alice has joined the chat.");
    assert_eq!(announcement.sender, "System");

    // The sender receives her own join announcement too.
    let announcement = next_system_message(&mut alice_events).await;
    assert_eq!(announcement.text, "alice has joined the chat.");

    server.stop().await;
}

#[tokio::test]
async fn text_is_broadcast_as_chat_message_to_all_including_sender() {
    let (server, _server_events, addr) = start_server().await;

    let (_carol, mut carol_events) = connected_client(addr).await;
    let (bob, mut bob_events) = connected_client(addr).await;
    wait_for_clients(&server, 2).await;
    bob.login("bob").await.unwrap();

    bob.send_text("hello").await.unwrap();

    for events in [&mut carol_events, &mut bob_events] {
        let message = next_chat_message(events).await;
        assert_eq!(message.text, "hello");
        assert_eq!(message.sender, "bob");
        assert_eq!(message.display_name, "bob");
        assert!(!message.sender_id.is_empty());
    }

    server.stop().await;
}

#[tokio::test]
async fn broadcast_reaches_every_client_exactly_once_and_in_order() {
    let (server, _server_events, addr) = start_server().await;

    let (eve, mut eve_events) = connected_client(addr).await;
    let (_c1, mut c1_events) = connected_client(addr).await;
    let (_c2, mut c2_events) = connected_client(addr).await;
    wait_for_clients(&server, 3).await;
    eve.login("eve").await.unwrap();

    // Back-to-back broadcasts must arrive whole and in order.
    eve.send_text("first").await.unwrap();
    eve.send_text("second").await.unwrap();

    for events in [&mut eve_events, &mut c1_events, &mut c2_events] {
        let first = next_chat_message(events).await;
        assert_eq!(first.text, "first");
        let second = next_chat_message(events).await;
        assert_eq!(second.text, "second");

        // Exactly one copy of each: nothing further shows up.
        let extra = count_chat_messages(events, Duration::from_millis(300)).await;
        assert_eq!(extra, 0, "received duplicate broadcast copies");
    }

    server.stop().await;
}

#[tokio::test]
async fn logged_in_disconnect_announces_leave_anonymous_does_not() {
    let (server, _server_events, addr) = start_server().await;

    let (_observer, mut observer_events) = connected_client(addr).await;

    let (alice, _alice_events) = connected_client(addr).await;
    wait_for_clients(&server, 2).await;
    alice.login("alice").await.unwrap();
    let joined = next_system_message(&mut observer_events).await;
    assert_eq!(joined.text, "alice has joined the chat.");

    alice.disconnect().await;
    let left = next_system_message(&mut observer_events).await;
    assert_eq!(left.text, "alice has left the chat.");

    // A client that never logged in leaves silently.
    let (ghost, _ghost_events) = connected_client(addr).await;
    ghost.disconnect().await;
    assert_no_envelope(&mut observer_events, Duration::from_millis(400)).await;

    server.stop().await;
}

#[tokio::test]
async fn discovery_request_is_answered_to_requester_only() {
    let config = loopback_config();
    let transform = Arc::new(DiscoveryResponder::new("test-server"));
    let (server, _server_events) = ChatServer::with_transform(config, transform).unwrap();
    let addr = server.start().await.unwrap();

    let (asker, mut asker_events) = connected_client(addr).await;
    let (_other, mut other_events) = connected_client(addr).await;
    wait_for_clients(&server, 2).await;

    let request = DiscoveryRequest {
        name: "asker-machine".into(),
    };
    let envelope = MessageEnvelope::create(&request, DiscoveryRequest::TYPE_NAME).unwrap();
    asker.send_envelope(&envelope).await.unwrap();

    let reply = next_envelope(&mut asker_events).await;
    assert!(reply.is(DiscoveryResponse::TYPE_NAME));
    let response: DiscoveryResponse = reply.payload().unwrap();
    assert!(response.is_chat_server);
    assert_eq!(response.server_name, "test-server");

    // The request is dropped from broadcast: nobody else hears it.
    assert_no_envelope(&mut other_events, Duration::from_millis(300)).await;

    server.stop().await;
}

#[tokio::test]
async fn non_discovery_envelopes_pass_through_transform_and_broadcast_verbatim() {
    let config = loopback_config();
    let transform = Arc::new(DiscoveryResponder::new("test-server"));
    let (server, _server_events) = ChatServer::with_transform(config, transform).unwrap();
    let addr = server.start().await.unwrap();

    let (sender, mut sender_events) = connected_client(addr).await;
    let (_receiver, mut receiver_events) = connected_client(addr).await;
    wait_for_clients(&server, 2).await;

    let custom = serde_json::json!({ "value": 42 });
    let envelope = MessageEnvelope::create(&custom, "CustomThing").unwrap();
    sender.send_envelope(&envelope).await.unwrap();

    for events in [&mut sender_events, &mut receiver_events] {
        let received = next_envelope(events).await;
        assert_eq!(received, envelope);
    }

    server.stop().await;
}
