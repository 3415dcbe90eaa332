//! Shared error type across lanchat crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, LanChatError>;

/// Unified error type used by core and net.
#[derive(Debug, Error)]
pub enum LanChatError {
    /// A frame header declared a length outside `1..=MAX_FRAME_BYTES`,
    /// or a payload exceeded the frame limit on the write side.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    /// The kind byte is neither Text(1) nor JsonEnvelope(2).
    #[error("unknown frame kind: {0}")]
    UnknownKind(u8),
    /// The peer closed the connection mid-frame (or before a frame).
    #[error("connection closed")]
    ConnectionClosed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    /// An operation that needs a live connection found none.
    #[error("not connected")]
    NotConnected,
    /// `send_text` was called before a successful `login`.
    #[error("not logged in")]
    NotLoggedIn,
    /// The server is already in the Listening state.
    #[error("server already listening")]
    AlreadyListening,
    /// All reconnect attempts were exhausted.
    #[error("unable to connect after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
    #[error("config error: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl LanChatError {
    /// Whether this error means "the peer went away" rather than a
    /// protocol or logic failure. Disconnects are a normal part of the
    /// lifecycle: handlers clean up quietly instead of surfacing them.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, LanChatError::ConnectionClosed | LanChatError::Io(_))
    }
}
