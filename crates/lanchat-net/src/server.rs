//! Broadcast chat server.
//!
//! Lifecycle: `Stopped -> Listening -> Stopped`. The accept loop spawns
//! one supervised handler per connection into a `JoinSet`; `stop()`
//! cancels everything and waits for the accept loop, which in turn waits
//! for every in-flight handler before clearing the roster.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use lanchat_core::protocol::envelope::MessageEnvelope;
use lanchat_core::protocol::frame::{read_frame, FrameKind};
use lanchat_core::protocol::messages::{ChatMessage, Login, SystemMessage};
use lanchat_core::{LanChatError, Result};

use crate::config::ServerConfig;
use crate::events::ServerEvent;
use crate::roster::Roster;
use crate::session::Session;
use crate::transform::EnvelopeTransform;

pub struct ChatServer {
    inner: Arc<ServerInner>,
    accept: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

struct ServerInner {
    config: ServerConfig,
    roster: Roster,
    events: mpsc::Sender<ServerEvent>,
    transform: Option<Arc<dyn EnvelopeTransform>>,
    /// Held across one whole broadcast so two broadcasts can never
    /// interleave their per-client writes.
    broadcast_lock: tokio::sync::Mutex<()>,
    cancel: std::sync::Mutex<CancellationToken>,
}

/// Why a connection handler exited.
#[derive(Debug, Clone, Copy)]
enum CloseReason {
    /// Server shutdown.
    Cancelled,
    /// The peer closed the connection or the socket failed.
    PeerClosed,
    /// Protocol or handling error; the connection was torn down.
    Failed,
}

impl ChatServer {
    /// Build a server without an envelope transform. Returns the event
    /// receiver alongside; events are lossy if the receiver lags.
    pub fn new(config: ServerConfig) -> Result<(Self, mpsc::Receiver<ServerEvent>)> {
        Self::build(config, None)
    }

    /// Build a server with an injected envelope transform.
    pub fn with_transform(
        config: ServerConfig,
        transform: Arc<dyn EnvelopeTransform>,
    ) -> Result<(Self, mpsc::Receiver<ServerEvent>)> {
        Self::build(config, Some(transform))
    }

    fn build(
        config: ServerConfig,
        transform: Option<Arc<dyn EnvelopeTransform>>,
    ) -> Result<(Self, mpsc::Receiver<ServerEvent>)> {
        config.validate()?;
        let (events, events_rx) = mpsc::channel(config.event_capacity);
        let server = Self {
            inner: Arc::new(ServerInner {
                config,
                roster: Roster::new(),
                events,
                transform,
                broadcast_lock: tokio::sync::Mutex::new(()),
                cancel: std::sync::Mutex::new(CancellationToken::new()),
            }),
            accept: tokio::sync::Mutex::new(None),
        };
        Ok((server, events_rx))
    }

    /// Bind the configured address and start accepting connections.
    /// Returns the bound local address.
    pub async fn start(&self) -> Result<std::net::SocketAddr> {
        let mut accept = self.accept.lock().await;
        if accept.is_some() {
            return Err(LanChatError::AlreadyListening);
        }

        let listener = TcpListener::bind(&self.inner.config.listen).await?;
        let addr = listener.local_addr()?;

        let cancel = CancellationToken::new();
        *self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = cancel.clone();

        let inner = Arc::clone(&self.inner);
        *accept = Some(tokio::spawn(accept_loop(inner, listener, cancel)));

        tracing::info!(%addr, "server listening");
        Ok(addr)
    }

    /// Cancel the accept loop and every handler, wait for them, and
    /// clear the roster. Idempotent.
    pub async fn stop(&self) {
        let handle = self.accept.lock().await.take();
        let Some(handle) = handle else { return };

        self.inner
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();

        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "accept loop join failed");
        }
    }

    /// Send one envelope to every connected session.
    pub async fn broadcast(&self, envelope: &MessageEnvelope) -> Result<()> {
        self.inner.broadcast(envelope).await
    }

    pub fn client_count(&self) -> usize {
        self.inner.roster.len()
    }
}

async fn accept_loop(inner: Arc<ServerInner>, listener: TcpListener, cancel: CancellationToken) {
    let mut handlers = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let (read, write) = stream.into_split();
                    let session = Arc::new(Session::new(addr, write));
                    tracing::info!(id = %session.id(), %addr, "client connected");

                    inner.roster.insert(Arc::clone(&session));
                    inner.emit(ServerEvent::ClientConnected { id: session.id(), addr });

                    let handler_inner = Arc::clone(&inner);
                    let handler_cancel = cancel.clone();
                    handlers.spawn(async move {
                        handler_inner.run_client(session, read, handler_cancel).await;
                    });
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            },

            // Reap finished handlers as we go so the set stays small.
            Some(finished) = handlers.join_next(), if !handlers.is_empty() => {
                if let Err(e) = finished {
                    tracing::warn!(error = %e, "client handler panicked");
                }
            }
        }
    }

    drop(listener);

    // Handlers observe the cancelled token; wait for all of them.
    while let Some(finished) = handlers.join_next().await {
        if let Err(e) = finished {
            tracing::warn!(error = %e, "client handler panicked");
        }
    }

    inner.roster.clear();
    tracing::info!("server stopped");
}

impl ServerInner {
    async fn run_client(
        &self,
        session: Arc<Session>,
        mut read: OwnedReadHalf,
        cancel: CancellationToken,
    ) {
        let reason = loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break CloseReason::Cancelled,
                r = read_frame(&mut read) => r,
            };

            let step = match result {
                Ok((FrameKind::Text, payload)) => self.on_text(&session, payload).await,
                Ok((FrameKind::JsonEnvelope, payload)) => self.on_envelope(&session, payload).await,
                Err(e) if e.is_disconnect() => break CloseReason::PeerClosed,
                Err(e) => {
                    self.emit(ServerEvent::ClientError {
                        id: session.id(),
                        error: e.to_string(),
                    });
                    tracing::warn!(id = %session.id(), error = %e, "protocol error, closing connection");
                    break CloseReason::Failed;
                }
            };

            if let Err(e) = step {
                self.emit(ServerEvent::ClientError {
                    id: session.id(),
                    error: e.to_string(),
                });
                tracing::warn!(id = %session.id(), error = %e, "message handling failed, closing connection");
                break CloseReason::Failed;
            }
        };

        self.roster.remove(&session.id());

        let username = session.username();
        tracing::info!(
            id = %session.id(),
            addr = %session.addr(),
            username = username.as_deref().unwrap_or(""),
            messages = session.messages_sent(),
            reason = ?reason,
            "client disconnected"
        );

        // No farewell during server shutdown: every other session is
        // being torn down at the same time.
        if username.is_some() && !matches!(reason, CloseReason::Cancelled) {
            self.announce(format!("{} has left the chat.", session.display_name()))
                .await;
        }

        self.emit(ServerEvent::ClientDisconnected {
            id: session.id(),
            username,
        });
    }

    async fn on_text(&self, session: &Arc<Session>, payload: Bytes) -> Result<()> {
        session.touch();

        let text = String::from_utf8_lossy(&payload).into_owned();
        self.emit(ServerEvent::TextReceived {
            id: session.id(),
            text: text.clone(),
        });

        let display_name = session.display_name();
        let message = ChatMessage {
            text,
            sender_id: session.id().to_string(),
            sender: display_name.clone(),
            display_name,
        };
        let envelope = MessageEnvelope::create(&message, ChatMessage::TYPE_NAME)?;
        self.broadcast(&envelope).await
    }

    async fn on_envelope(&self, session: &Arc<Session>, payload: Bytes) -> Result<()> {
        session.touch();

        let envelope = MessageEnvelope::from_bytes(&payload)?;
        self.emit(ServerEvent::EnvelopeReceived {
            id: session.id(),
            type_name: envelope.type_name.clone(),
        });

        // Login updates the session and announces the join; the Login
        // envelope itself is never re-broadcast.
        if envelope.is(Login::TYPE_NAME) {
            let login: Login = envelope.payload()?;
            tracing::info!(id = %session.id(), username = %login.username, "login");
            session.set_username(login.username.clone());
            self.announce(format!("{} has joined the chat.", login.username))
                .await;
            return Ok(());
        }

        let envelope = match &self.transform {
            Some(transform) => match transform.transform(session, envelope).await? {
                Some(envelope) => envelope,
                None => return Ok(()),
            },
            None => envelope,
        };
        self.broadcast(&envelope).await
    }

    /// Broadcast a `SystemMessage`; failures are logged, never raised.
    async fn announce(&self, text: String) {
        let message = SystemMessage::announce(text);
        match MessageEnvelope::create(&message, SystemMessage::TYPE_NAME) {
            Ok(envelope) => {
                if let Err(e) = self.broadcast(&envelope).await {
                    tracing::warn!(error = %e, "announcement broadcast failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "announcement encode failed"),
        }
    }

    /// Send one envelope to a snapshot of the roster. Sends run
    /// concurrently and the call waits for all of them; per-client
    /// failures are logged and skipped. There is no per-client timeout,
    /// so one hung client delays the whole broadcast.
    async fn broadcast(&self, envelope: &MessageEnvelope) -> Result<()> {
        let _guard = self.broadcast_lock.lock().await;

        let payload = envelope.to_bytes()?;
        let sessions = self.roster.snapshot();

        let mut sends = FuturesUnordered::new();
        for session in sessions {
            let payload = payload.clone();
            sends.push(async move {
                if let Err(e) = session.send_frame(FrameKind::JsonEnvelope, &payload).await {
                    tracing::warn!(id = %session.id(), error = %e, "broadcast send failed");
                }
            });
        }
        while sends.next().await.is_some() {}
        Ok(())
    }

    fn emit(&self, event: ServerEvent) {
        if self.events.try_send(event).is_err() {
            tracing::debug!("server event dropped (receiver lagging or gone)");
        }
    }
}
