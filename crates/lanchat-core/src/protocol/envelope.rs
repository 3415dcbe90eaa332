//! Typed JSON envelope carried in JsonEnvelope frames.
//!
//! The envelope wraps a camelCase-serialized payload object together with
//! a type name. The name string is the only routing discriminator on the
//! wire; the numeric id is a deterministic hash of the name kept for
//! cheap equality checks and logging.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Wire wrapper for structured (non-plain-text) messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// FNV-1a hash of `type_name`.
    pub type_id: i32,
    /// Routing discriminator (e.g. "Login", "ChatMessage").
    pub type_name: Option<String>,
    /// camelCase JSON of the payload object.
    pub json: String,
}

impl MessageEnvelope {
    /// Serialize `value` and wrap it with the given type name.
    pub fn create<T: Serialize>(value: &T, type_name: &str) -> Result<Self> {
        Ok(Self {
            type_id: type_id_of(type_name),
            type_name: Some(type_name.to_string()),
            json: serde_json::to_string(value)?,
        })
    }

    /// Parse the inner payload back into `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.json)?)
    }

    /// Case-insensitive type-name check.
    pub fn is(&self, type_name: &str) -> bool {
        self.type_name
            .as_deref()
            .map(|n| n.eq_ignore_ascii_case(type_name))
            .unwrap_or(false)
    }

    /// Encode the envelope itself as UTF-8 JSON bytes (frame payload).
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decode an envelope from a JsonEnvelope frame payload.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(buf)?)
    }
}

/// 32-bit FNV-1a over the type name, reinterpreted as i32.
pub fn type_id_of(type_name: &str) -> i32 {
    let mut hash: u32 = 0x811c_9dc5;
    for b in type_name.bytes() {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash as i32
}
