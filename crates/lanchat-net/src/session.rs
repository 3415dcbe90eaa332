//! Per-connection server-side state.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::time::Instant;
use uuid::Uuid;

use lanchat_core::protocol::envelope::MessageEnvelope;
use lanchat_core::protocol::frame::{write_frame, FrameKind};
use lanchat_core::Result;

/// One connected client.
///
/// The read half stays with the connection handler; the write half lives
/// here behind a mutex, so concurrent sends to the same client are
/// serialized and frame bytes never interleave on the wire. Username and
/// activity fields are mutated only by the session's own handler.
pub struct Session {
    id: Uuid,
    addr: SocketAddr,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    username: Mutex<Option<String>>,
    connected_at: Instant,
    last_activity: Mutex<Instant>,
    messages_sent: AtomicU64,
}

impl Session {
    pub fn new(addr: SocketAddr, writer: OwnedWriteHalf) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            addr,
            writer: tokio::sync::Mutex::new(writer),
            username: Mutex::new(None),
            connected_at: now,
            last_activity: Mutex::new(now),
            messages_sent: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn username(&self) -> Option<String> {
        self.username
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_username(&self, username: impl Into<String>) {
        *self.username.lock().unwrap_or_else(|e| e.into_inner()) = Some(username.into());
    }

    /// Username, or a placeholder for sessions that never logged in.
    pub fn display_name(&self) -> String {
        self.username().unwrap_or_else(|| "anonymous".to_string())
    }

    /// Record one received frame: bump the activity timestamp and the
    /// message counter.
    pub fn touch(&self) {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write one frame to this client. The writer mutex guarantees the
    /// frame's bytes are contiguous even under concurrent callers.
    pub async fn send_frame(&self, kind: FrameKind, payload: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, kind, payload).await
    }

    pub async fn send_envelope(&self, envelope: &MessageEnvelope) -> Result<()> {
        let payload = envelope.to_bytes()?;
        self.send_frame(FrameKind::JsonEnvelope, &payload).await
    }
}
