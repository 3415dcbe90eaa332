//! Reconnecting chat client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lanchat_core::protocol::envelope::MessageEnvelope;
use lanchat_core::protocol::frame::{read_frame, write_frame, FrameKind};
use lanchat_core::protocol::messages::Login;
use lanchat_core::{LanChatError, Result};

use crate::config::ClientConfig;
use crate::events::ClientEvent;

pub struct ChatClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    /// Last address given to `connect`; the reconnect target.
    target: std::sync::Mutex<Option<SocketAddr>>,
    conn: tokio::sync::Mutex<Option<Connection>>,
    /// Serializes `ensure_connected` so concurrent callers do not race
    /// reconnect attempts.
    ensure_lock: tokio::sync::Mutex<()>,
    /// Last username sent via `login`, replayed after a reconnect.
    username: std::sync::Mutex<Option<String>>,
    events: mpsc::Sender<ClientEvent>,
    /// Bumped per `open`; lets a stale read loop recognize that the
    /// connection slot now holds a newer connection than its own.
    generation: AtomicU64,
}

struct Connection {
    generation: u64,
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    cancel: CancellationToken,
    read_task: JoinHandle<()>,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<(Self, mpsc::Receiver<ClientEvent>)> {
        config.validate()?;
        let (events, events_rx) = mpsc::channel(config.event_capacity);
        let client = Self {
            inner: Arc::new(ClientInner {
                config,
                target: std::sync::Mutex::new(None),
                conn: tokio::sync::Mutex::new(None),
                ensure_lock: tokio::sync::Mutex::new(()),
                username: std::sync::Mutex::new(None),
                events,
                generation: AtomicU64::new(0),
            }),
        };
        Ok((client, events_rx))
    }

    /// Connect to a server and start the read loop. Replaces any
    /// existing connection.
    pub async fn connect(&self, addr: SocketAddr) -> Result<()> {
        *self
            .inner
            .target
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(addr);
        self.disconnect().await;
        ClientInner::open(&self.inner, addr).await
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.conn.lock().await.is_some()
    }

    /// Ensure connectivity, then claim a username. The username is
    /// remembered and replayed after any later reconnect.
    pub async fn login(&self, username: &str) -> Result<()> {
        self.ensure_connected().await?;

        let login = Login {
            username: username.to_string(),
        };
        let envelope = MessageEnvelope::create(&login, Login::TYPE_NAME)?;
        self.inner
            .write(FrameKind::JsonEnvelope, &envelope.to_bytes()?)
            .await?;

        *self
            .inner
            .username
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(username.to_string());
        Ok(())
    }

    /// Send a chat text line. Requires a prior `login`. An I/O failure
    /// triggers exactly one reconnect-and-resend; a second failure
    /// propagates.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        let logged_in = self
            .inner
            .username
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some();
        if !logged_in {
            return Err(LanChatError::NotLoggedIn);
        }
        self.send_with_retry(FrameKind::Text, text.as_bytes()).await
    }

    /// Send a structured envelope with the same single-retry policy as
    /// `send_text`.
    pub async fn send_envelope(&self, envelope: &MessageEnvelope) -> Result<()> {
        let payload = envelope.to_bytes()?;
        self.send_with_retry(FrameKind::JsonEnvelope, &payload).await
    }

    /// The reconnection primitive. No-op when connected; otherwise up to
    /// `config.reconnect_attempts` connect attempts with exponential
    /// backoff (base `reconnect_base_delay_ms`, doubling), replaying the
    /// last-known username on success.
    pub async fn ensure_connected(&self) -> Result<()> {
        let _guard = self.inner.ensure_lock.lock().await;

        if self.inner.conn.lock().await.is_some() {
            return Ok(());
        }

        let target = *self
            .inner
            .target
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let Some(addr) = target else {
            return Err(LanChatError::NotConnected);
        };

        let attempts = self.inner.config.reconnect_attempts.max(1);
        let mut delay = Duration::from_millis(self.inner.config.reconnect_base_delay_ms);

        for attempt in 1..=attempts {
            match ClientInner::open(&self.inner, addr).await {
                Ok(()) => {
                    let username = self
                        .inner
                        .username
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .clone();
                    if let Some(username) = username {
                        let login = Login { username };
                        let envelope = MessageEnvelope::create(&login, Login::TYPE_NAME)?;
                        self.inner
                            .write(FrameKind::JsonEnvelope, &envelope.to_bytes()?)
                            .await?;
                    }
                    tracing::info!(attempt, %addr, "connected");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(attempt, %addr, error = %e, "connect attempt failed");
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(LanChatError::ReconnectExhausted { attempts })
    }

    /// Cancel the read loop and drop the connection. Intentional: no
    /// `Disconnected` event fires.
    pub async fn disconnect(&self) {
        let conn = self.inner.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.cancel.cancel();
            if let Err(e) = conn.read_task.await {
                tracing::debug!(error = %e, "read task join failed");
            }
            tracing::info!("disconnected");
        }
    }

    async fn send_with_retry(&self, kind: FrameKind, payload: &[u8]) -> Result<()> {
        match self.inner.write(kind, payload).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_disconnect() || matches!(e, LanChatError::NotConnected) => {
                tracing::warn!(error = %e, "send failed, reconnecting once");
                self.inner.drop_connection().await;
                self.ensure_connected().await?;
                self.inner.write(kind, payload).await
            }
            Err(e) => Err(e),
        }
    }
}

impl ClientInner {
    async fn open(inner: &Arc<Self>, addr: SocketAddr) -> Result<()> {
        let stream = TcpStream::connect(addr).await?;
        let (read, write) = stream.into_split();

        let generation = inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        let loop_inner = Arc::clone(inner);
        let loop_cancel = cancel.clone();
        let read_task = tokio::spawn(async move {
            loop_inner.read_loop(read, loop_cancel, generation).await;
        });

        *inner.conn.lock().await = Some(Connection {
            generation,
            writer: Arc::new(tokio::sync::Mutex::new(write)),
            cancel,
            read_task,
        });
        Ok(())
    }

    async fn read_loop(&self, mut read: OwnedReadHalf, cancel: CancellationToken, generation: u64) {
        let intentional = loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break true,
                r = read_frame(&mut read) => r,
            };

            match result {
                Ok((FrameKind::Text, payload)) => {
                    self.emit(ClientEvent::TextReceived(
                        String::from_utf8_lossy(&payload).into_owned(),
                    ));
                }
                Ok((FrameKind::JsonEnvelope, payload)) => {
                    match MessageEnvelope::from_bytes(&payload) {
                        Ok(envelope) => self.emit(ClientEvent::EnvelopeReceived(envelope)),
                        Err(e) => {
                            self.emit(ClientEvent::Error(e.to_string()));
                            tracing::warn!(error = %e, "malformed envelope, closing connection");
                            break false;
                        }
                    }
                }
                // A vanished peer is a normal disconnect, exit quietly.
                Err(e) if e.is_disconnect() => break false,
                Err(e) => {
                    self.emit(ClientEvent::Error(e.to_string()));
                    tracing::warn!(error = %e, "read loop failed");
                    break false;
                }
            }
        };

        // Only clear the slot if it still holds our connection; an
        // intentional teardown or a reconnect may have replaced it.
        let owned = {
            let mut guard = self.conn.lock().await;
            match guard.as_ref() {
                Some(conn) if conn.generation == generation => {
                    if let Some(conn) = guard.take() {
                        conn.cancel.cancel();
                    }
                    true
                }
                _ => false,
            }
        };
        if owned && !intentional {
            tracing::info!("connection lost");
            self.emit(ClientEvent::Disconnected);
        }
    }

    async fn write(&self, kind: FrameKind, payload: &[u8]) -> Result<()> {
        let writer = {
            let guard = self.conn.lock().await;
            let conn = guard.as_ref().ok_or(LanChatError::NotConnected)?;
            Arc::clone(&conn.writer)
        };
        let mut writer = writer.lock().await;
        write_frame(&mut *writer, kind, payload).await
    }

    /// Tear down a broken connection without emitting `Disconnected`
    /// (the caller is about to reconnect).
    async fn drop_connection(&self) {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.cancel.cancel();
        }
    }

    fn emit(&self, event: ClientEvent) {
        if self.events.try_send(event).is_err() {
            tracing::debug!("client event dropped (receiver lagging or gone)");
        }
    }
}
