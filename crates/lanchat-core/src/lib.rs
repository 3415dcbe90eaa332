//! lanchat core: wire-level protocol primitives and error types.
//!
//! This crate defines the framed TCP wire format, the JSON message
//! envelope, and the well-known payload types shared by the server and
//! client. It carries no networking policy of its own; the codec works
//! over any `AsyncRead`/`AsyncWrite` stream.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `LanChatError`/`Result` so a peer
//! sending malformed frames can never crash the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{LanChatError, Result};
