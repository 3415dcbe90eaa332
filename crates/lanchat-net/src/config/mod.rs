//! Config loader (strict parsing).

pub mod schema;

use std::fs;

use lanchat_core::error::{LanChatError, Result};

pub use schema::{ClientConfig, LanChatConfig, ServerConfig};

pub fn load_from_file(path: &str) -> Result<LanChatConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| LanChatError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<LanChatConfig> {
    let cfg: LanChatConfig =
        serde_yaml::from_str(s).map_err(|e| LanChatError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
