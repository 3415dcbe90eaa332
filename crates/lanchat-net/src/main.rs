//! lanchat server binary.
//!
//! - Loads `lanchat.yaml` (path from the first CLI argument), falling
//!   back to defaults when the file does not exist.
//! - Runs the broadcast server with the LAN discovery responder.
//! - Logs server events until ctrl-c, then shuts down cleanly.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use lanchat_net::config::{self, LanChatConfig};
use lanchat_net::events::ServerEvent;
use lanchat_net::server::ChatServer;
use lanchat_net::transform::DiscoveryResponder;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "lanchat.yaml".to_string());
    let cfg = if Path::new(&path).exists() {
        config::load_from_file(&path).expect("config load failed")
    } else {
        tracing::info!(%path, "config file not found, using defaults");
        LanChatConfig::default()
    };

    let transform = Arc::new(DiscoveryResponder::new(cfg.server.server_name.clone()));
    let (server, mut events) =
        ChatServer::with_transform(cfg.server, transform).expect("server build failed");

    let addr = server.start().await.expect("server start failed");
    tracing::info!(%addr, "lanchat server listening");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(ServerEvent::ClientError { id, error }) => {
                    tracing::warn!(%id, %error, "client error");
                }
                Some(event) => tracing::debug!(?event, "server event"),
                None => break,
            },
        }
    }

    tracing::info!("shutting down");
    server.stop().await;
}
