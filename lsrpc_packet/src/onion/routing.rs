/*! Routing JSON records carried in frame tails.

Three records exist: intermediate hops get a [`RelayRouting`] naming the
next hop, the terminal hop gets the serialized
[`Destination`](crate::destination::Destination), and the innermost
payload frame carries an [`InnerRouting`] annotation for the destination
server itself. The plaintext wrapper tail is a [`WrapperMeta`].

All records are serialized as compact UTF-8 JSON with lowercase hex keys.
*/

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lsrpc_crypto::{EncType, PublicKey};

/// Routing tail of an intermediate layer: which hop the decrypted inner
/// blob goes to, and the ephemeral key that hop needs for its own layer.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RelayRouting {
    /// Ed25519 identity of the next hop, lowercase hex.
    pub destination: String,
    /// Ephemeral public key for the next hop's layer, lowercase hex.
    pub ephemeral_key: String,
    /// Cipher of the next layer.
    pub enc_type: EncType,
}

impl RelayRouting {
    /// Create a routing record pointing at the hop with the given
    /// identity.
    pub fn new(next_identity: &str, next_ephemeral: &PublicKey) -> RelayRouting {
        RelayRouting {
            destination: next_identity.to_owned(),
            ephemeral_key: hex::encode(next_ephemeral.as_bytes()),
            enc_type: EncType::AesGcm,
        }
    }
}

/// Route annotation attached to the innermost payload frame. The
/// destination server reads extra request headers from it.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct InnerRouting {
    /// Extra HTTP headers for the destination request.
    pub headers: HashMap<String, String>,
}

/// Plaintext metadata tail of the outermost wrapper. The entry hop
/// derives its layer key from the advertised ephemeral key.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WrapperMeta {
    /// Ephemeral public key for the outermost layer, lowercase hex.
    pub ephemeral_key: String,
    /// Cipher of the outermost layer.
    pub enc_type: EncType,
}

impl WrapperMeta {
    /// Create metadata advertising the given ephemeral key.
    pub fn new(ephemeral: &PublicKey) -> WrapperMeta {
        WrapperMeta {
            ephemeral_key: hex::encode(ephemeral.as_bytes()),
            enc_type: EncType::AesGcm,
        }
    }
}
