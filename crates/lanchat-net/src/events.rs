//! Server and client notifications.
//!
//! Events travel over bounded mpsc channels handed out at construction
//! instead of multicast callback registrations. Delivery is lossy by
//! design: a lagging consumer never stalls the accept loop, a handler, or
//! the client read loop.

use std::net::SocketAddr;

use uuid::Uuid;

use lanchat_core::protocol::envelope::MessageEnvelope;

/// Notifications emitted by [`crate::server::ChatServer`].
#[derive(Debug, Clone)]
pub enum ServerEvent {
    ClientConnected {
        id: Uuid,
        addr: SocketAddr,
    },
    ClientDisconnected {
        id: Uuid,
        username: Option<String>,
    },
    TextReceived {
        id: Uuid,
        text: String,
    },
    EnvelopeReceived {
        id: Uuid,
        type_name: Option<String>,
    },
    /// A protocol or handling failure on one connection. The connection
    /// is torn down; the server keeps running.
    ClientError {
        id: Uuid,
        error: String,
    },
}

/// Notifications emitted by [`crate::client::ChatClient`].
#[derive(Debug, Clone)]
pub enum ClientEvent {
    TextReceived(String),
    EnvelopeReceived(MessageEnvelope),
    /// The connection closed for a reason other than an intentional
    /// `disconnect()` call.
    Disconnected,
    Error(String),
}
