use serde::Deserialize;

use lanchat_core::error::{LanChatError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanChatConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for LanChatConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl LanChatConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(LanChatError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.server.validate()?;
        self.client.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Name reported in discovery responses.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            server_name: default_server_name(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(LanChatError::Config(format!(
                "server.listen is not a valid socket address: {}",
                self.listen
            )));
        }
        if self.server_name.trim().is_empty() {
            return Err(LanChatError::Config(
                "server.server_name must not be empty".into(),
            ));
        }
        validate_event_capacity("server.event_capacity", self.event_capacity)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.reconnect_attempts) {
            return Err(LanChatError::Config(
                "client.reconnect_attempts must be between 1 and 10".into(),
            ));
        }
        if !(100..=10_000).contains(&self.reconnect_base_delay_ms) {
            return Err(LanChatError::Config(
                "client.reconnect_base_delay_ms must be between 100 and 10000".into(),
            ));
        }
        validate_event_capacity("client.event_capacity", self.event_capacity)
    }
}

fn validate_event_capacity(field: &str, capacity: usize) -> Result<()> {
    if !(16..=65_536).contains(&capacity) {
        return Err(LanChatError::Config(format!(
            "{field} must be between 16 and 65536"
        )));
    }
    Ok(())
}

fn default_listen() -> String {
    "0.0.0.0:4650".into()
}
fn default_server_name() -> String {
    "lanchat".into()
}
fn default_event_capacity() -> usize {
    256
}
fn default_reconnect_attempts() -> u32 {
    3
}
fn default_reconnect_base_delay_ms() -> u64 {
    500
}
