/*! Directory entries and the per-request hop projection.
*/

use hex::FromHex;
use serde::Deserialize;

use lsrpc_crypto::{PublicKey, KEY_SIZE};

/** Service node as listed by the seed directory.

A node is usable for path building iff its identity key, encryption key,
address and storage port are all present. Entries are never mutated once
observed; a directory refresh replaces the whole list.
*/
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ServiceNode {
    /// Ed25519 identity key, hex.
    #[serde(default)]
    pub pubkey_ed25519: String,
    /// X25519 encryption key, hex.
    #[serde(default)]
    pub pubkey_x25519: String,
    /// Public IPv4 address.
    #[serde(default)]
    pub public_ip: String,
    /// HTTP storage port.
    #[serde(default)]
    pub storage_port: u16,
    /// LMQ port.
    #[serde(default)]
    pub storage_lmq_port: u16,
    /// Swarm this node belongs to.
    #[serde(default)]
    pub swarm_id: u64,
}

impl ServiceNode {
    /// Whether this entry carries everything a hop needs.
    pub fn is_valid(&self) -> bool {
        !self.pubkey_ed25519.is_empty()
            && !self.pubkey_x25519.is_empty()
            && !self.public_ip.is_empty()
            && self.storage_port != 0
    }
}

/** Member of an onion path, projected from a `ServiceNode` for the
lifetime of a single request.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathHop {
    /// Ed25519 identity, lowercase hex. Routing records address this hop
    /// by it.
    pub ed25519_pubkey: String,
    /// X25519 encryption key layers for this hop are sealed with.
    pub x25519_pubkey: PublicKey,
    /// Public IP address.
    pub ip: String,
    /// HTTP storage port.
    pub port: u16,
}

impl PathHop {
    /// Project a directory entry into a path hop. Returns `None` for
    /// entries that are incomplete or whose encryption key is not 32
    /// bytes of hex.
    pub fn from_service_node(node: &ServiceNode) -> Option<PathHop> {
        if !node.is_valid() {
            return None;
        }
        let key_bytes = <[u8; KEY_SIZE]>::from_hex(&node.pubkey_x25519).ok()?;
        Some(PathHop {
            ed25519_pubkey: node.pubkey_ed25519.to_lowercase(),
            x25519_pubkey: PublicKey::from(key_bytes),
            ip: node.public_ip.clone(),
            port: node.storage_port,
        })
    }
}
