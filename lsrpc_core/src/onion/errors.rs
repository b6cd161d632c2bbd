use thiserror::Error;

use lsrpc_crypto::CryptoError;
use lsrpc_packet::onion::FrameError;

/// Error that can happen when selecting an onion path.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PathError {
    /// Requested path length is zero.
    #[error("Requested path length is zero")]
    ZeroLength,
    /// Not enough valid candidates to build a path.
    #[error("Not enough valid candidates to build a path: need {need}, got {got}")]
    Insufficient {
        /// Hops the path needs.
        need: usize,
        /// Valid candidates available.
        got: usize,
    },
}

/// Error that can happen when building an onion envelope.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum BuildError {
    /// Destination is missing a mandatory field.
    #[error("Destination is missing a mandatory field")]
    InvalidDestination,
    /// A routing record could not be encoded as JSON.
    #[error("A routing record could not be encoded as JSON")]
    JsonEncode,
    /// Sealing a layer failed.
    #[error("Sealing a layer failed: {0}")]
    Crypto(CryptoError),
    /// Framing a layer failed.
    #[error("Framing a layer failed: {0}")]
    Frame(FrameError),
    /// Path selection failed.
    #[error("Path selection failed: {0}")]
    Path(PathError),
}
