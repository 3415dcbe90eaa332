//! Wire protocol modules.
//!
//! - `frame`: the length-prefixed binary framing layer (`[u32 LE
//!   length][u8 kind][payload]`).
//! - `envelope`: the typed JSON wrapper carried in JsonEnvelope frames.
//! - `messages`: well-known envelope payload types.
//!
//! All parsers are panic-free: malformed input is reported as
//! `LanChatError` instead of panicking or indexing raw buffers.

pub mod envelope;
pub mod frame;
pub mod messages;
