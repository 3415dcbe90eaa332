//! Envelope transform hook.
//!
//! Non-Login envelopes pass through an injected transform before the
//! server broadcasts them. A transform may rewrite the envelope, answer
//! it directly on the originating session, or drop it by returning
//! `Ok(None)`.

use std::sync::Arc;

use async_trait::async_trait;

use lanchat_core::protocol::envelope::MessageEnvelope;
use lanchat_core::protocol::messages::{DiscoveryRequest, DiscoveryResponse};
use lanchat_core::Result;

use crate::session::Session;

#[async_trait]
pub trait EnvelopeTransform: Send + Sync {
    /// Inspect an envelope before broadcast. `Ok(None)` drops it;
    /// `Ok(Some(env))` broadcasts `env` verbatim.
    async fn transform(
        &self,
        session: &Arc<Session>,
        envelope: MessageEnvelope,
    ) -> Result<Option<MessageEnvelope>>;
}

/// Answers `DiscoveryRequest` envelopes with a `DiscoveryResponse` sent
/// to the requesting session only, and keeps the request out of the
/// broadcast stream. Everything else passes through untouched.
pub struct DiscoveryResponder {
    server_name: String,
}

impl DiscoveryResponder {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
        }
    }
}

#[async_trait]
impl EnvelopeTransform for DiscoveryResponder {
    async fn transform(
        &self,
        session: &Arc<Session>,
        envelope: MessageEnvelope,
    ) -> Result<Option<MessageEnvelope>> {
        if !envelope.is(DiscoveryRequest::TYPE_NAME) {
            return Ok(Some(envelope));
        }

        let request: DiscoveryRequest = envelope.payload()?;
        tracing::debug!(id = %session.id(), from = %request.name, "discovery request");

        let response = DiscoveryResponse {
            is_chat_server: true,
            server_name: self.server_name.clone(),
            name: self.server_name.clone(),
        };
        let reply = MessageEnvelope::create(&response, DiscoveryResponse::TYPE_NAME)?;
        session.send_envelope(&reply).await?;
        Ok(None)
    }
}
