//! Well-known envelope payload types.
//!
//! Every type carries a `TYPE_NAME` constant used as the envelope
//! discriminator. All fields are camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Sent by a client to claim a username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    pub username: String,
}

impl Login {
    pub const TYPE_NAME: &'static str = "Login";
}

/// Server-enriched chat text, broadcast to every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub text: String,
    /// Session id of the sender.
    pub sender_id: String,
    pub sender: String,
    pub display_name: String,
}

impl ChatMessage {
    pub const TYPE_NAME: &'static str = "ChatMessage";
}

/// Server announcements (joins, leaves).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    pub text: String,
    pub sender: String,
}

impl SystemMessage {
    pub const TYPE_NAME: &'static str = "SystemMessage";
    pub const SENDER: &'static str = "System";

    /// A system announcement with the canonical sender.
    pub fn announce(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Self::SENDER.to_string(),
        }
    }
}

/// LAN discovery probe sent by clients looking for a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    /// Name of the machine asking.
    pub name: String,
}

impl DiscoveryRequest {
    pub const TYPE_NAME: &'static str = "DiscoveryRequest";
}

/// Answer to a discovery probe, sent to the requester only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResponse {
    pub is_chat_server: bool,
    pub server_name: String,
    pub name: String,
}

impl DiscoveryResponse {
    pub const TYPE_NAME: &'static str = "DiscoveryResponse";
}
