//! Top-level facade crate for lanchat.
//!
//! Re-exports the protocol core and the networking library so users can
//! depend on a single crate.

pub mod core {
    pub use lanchat_core::*;
}

pub mod net {
    pub use lanchat_net::*;
}
