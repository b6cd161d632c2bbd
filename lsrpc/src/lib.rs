//! This crate reexports all lsrpc crates.

pub use lsrpc_binary_io as binary_io;
pub use lsrpc_core as core;
pub use lsrpc_crypto as crypto;
pub use lsrpc_packet as packet;

pub fn crate_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
