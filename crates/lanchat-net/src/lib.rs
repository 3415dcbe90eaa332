//! lanchat networking library.
//!
//! This crate wires the framed TCP protocol from `lanchat-core` into a
//! broadcast chat server (roster, supervised per-connection handlers,
//! envelope transform hook) and a reconnecting client. It is consumed by
//! the `lanchat-server` binary (`main.rs`) and by integration tests.

pub mod client;
pub mod config;
pub mod events;
pub mod roster;
pub mod server;
pub mod session;
pub mod transform;
