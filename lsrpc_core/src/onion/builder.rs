/*! Onion envelope construction.

Layers are built outside-in from the destination payload: the innermost
frame is sealed for the terminal hop, the result framed and sealed for the
hop before it, and so on until the entry hop. Every layer gets a fresh
ephemeral keypair whose public half is advertised to the hop by the
enclosing layer's routing record, so the builder threads the last
generated public key backwards through the loop.
*/

use std::sync::RwLock;

use rand::{thread_rng, CryptoRng, Rng};
use serde_json::Value;

use lsrpc_crypto::{derive_hop_key, generate_keypair, seal, PublicKey};
use lsrpc_packet::destination::Destination;
use lsrpc_packet::onion::{Frame, InnerRouting, RelayRouting, Wrapper, WrapperMeta};
use lsrpc_packet::service_node::{PathHop, ServiceNode};

use crate::config::ClientConfig;
use crate::directory::{DirectoryClient, DirectoryError};

use super::errors::{BuildError, PathError};
use super::path::{select_path, OnionPath};

/// Built onion request, ready for transport.
#[derive(Clone, Debug)]
pub struct OnionEnvelope {
    /// Outermost wrapper bytes, the HTTP POST body.
    pub bytes: Vec<u8>,
    /// Hop the wrapper must be sent to.
    pub entry: PathHop,
    /// Ephemeral public key the entry hop derives its layer key from.
    /// Also embedded in the wrapper metadata.
    pub entry_ephemeral_pub: PublicKey,
}

/// Builds onion envelopes over a snapshot of the service-node directory.
///
/// The node list is only mutated through [`set_nodes`](Self::set_nodes)
/// and [`refresh`](Self::refresh); concurrent builds observe either the
/// pre- or post-refresh list, never a mix.
pub struct OnionBuilder {
    nodes: RwLock<Vec<ServiceNode>>,
    path_length: usize,
}

impl OnionBuilder {
    /// Create a builder with an empty node list.
    pub fn new(config: &ClientConfig) -> OnionBuilder {
        OnionBuilder::with_nodes(config, Vec::new())
    }

    /// Create a builder over the given node list.
    pub fn with_nodes(config: &ClientConfig, nodes: Vec<ServiceNode>) -> OnionBuilder {
        OnionBuilder {
            nodes: RwLock::new(nodes),
            path_length: config.path_length,
        }
    }

    /// Replace the node list.
    pub fn set_nodes(&self, nodes: Vec<ServiceNode>) {
        *self.nodes.write().expect("node list lock poisoned") = nodes;
    }

    /// Snapshot of the current node list.
    pub fn nodes(&self) -> Vec<ServiceNode> {
        self.nodes.read().expect("node list lock poisoned").clone()
    }

    /// Refresh the node list from the seed directory. Returns how many
    /// nodes the new list holds.
    pub async fn refresh(&self, directory: &DirectoryClient, limit: u32) -> Result<usize, DirectoryError> {
        let nodes = directory.fetch(limit).await?;
        let count = nodes.len();
        info!("refreshed service-node list: {} entries", count);
        self.set_nodes(nodes);
        Ok(count)
    }

    /// Build an envelope for `payload` over a freshly selected path.
    pub fn build(&self, payload: &Value, destination: &Destination) -> Result<OnionEnvelope, BuildError> {
        self.build_with_rng(&mut thread_rng(), payload, destination)
    }

    /// Like [`build`](Self::build) with an injected randomness source, so
    /// deterministic streams produce byte-identical envelopes.
    pub fn build_with_rng<R>(
        &self,
        rng: &mut R,
        payload: &Value,
        destination: &Destination,
    ) -> Result<OnionEnvelope, BuildError>
    where
        R: Rng + CryptoRng,
    {
        let nodes = self.nodes();
        let path = select_path(rng, &nodes, self.path_length).map_err(BuildError::Path)?;
        build_onion(rng, payload, destination, &path)
    }
}

/// Compose the layered envelope for an already selected path.
pub fn build_onion<R>(
    rng: &mut R,
    payload: &Value,
    destination: &Destination,
    path: &OnionPath,
) -> Result<OnionEnvelope, BuildError>
where
    R: Rng + CryptoRng,
{
    if path.is_empty() {
        return Err(BuildError::Path(PathError::ZeroLength));
    }
    if !destination.is_valid() {
        return Err(BuildError::InvalidDestination);
    }

    let payload_bytes = serde_json::to_vec(payload).map_err(|_| BuildError::JsonEncode)?;
    let destination_route = serde_json::to_vec(&InnerRouting::default()).map_err(|_| BuildError::JsonEncode)?;
    debug!(
        "building {}-hop envelope for a {} byte payload",
        path.len(),
        payload_bytes.len()
    );

    // Innermost frame, delivered to the destination by the terminal hop.
    let mut blob = Frame::new(payload_bytes, destination_route)
        .to_vec()
        .map_err(BuildError::Frame)?;

    // The final ephemeral pair identifies the request towards the
    // terminal hop; its public half seeds the chain below.
    let (_final_secret, final_public) = generate_keypair(rng);
    let mut next_ephemeral_pub = final_public;

    for (index, hop) in path.hops.iter().enumerate().rev() {
        let (layer_secret, layer_public) = generate_keypair(rng);

        let routing = if index == path.len() - 1 {
            serde_json::to_vec(destination).map_err(|_| BuildError::JsonEncode)?
        } else {
            let relay = RelayRouting::new(&path.hops[index + 1].ed25519_pubkey, &next_ephemeral_pub);
            serde_json::to_vec(&relay).map_err(|_| BuildError::JsonEncode)?
        };

        let layer_plain = Frame::new(blob, routing).to_vec().map_err(BuildError::Frame)?;
        let key = derive_hop_key(&layer_secret, &hop.x25519_pubkey);
        blob = seal(rng, &layer_plain, &key).map_err(BuildError::Crypto)?;
        next_ephemeral_pub = layer_public;
    }

    let wrapper = Wrapper::new(blob, WrapperMeta::new(&next_ephemeral_pub));
    let bytes = wrapper.encode().map_err(BuildError::Frame)?;

    Ok(OnionEnvelope {
        bytes,
        entry: path.entry().clone(),
        entry_ephemeral_pub: next_ephemeral_pub,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::convert::TryInto;

    use rand::rngs::StdRng;
    use rand::{thread_rng, SeedableRng};
    use serde_json::json;

    use super::*;
    use lsrpc_crypto::{open_from_peer, CryptoError, EncType, StaticSecret, IV_SIZE, TAG_SIZE};
    use lsrpc_packet::destination::Protocol;

    fn destination() -> Destination {
        Destination::new("example.invalid", 443, Protocol::Https, "/oxen/custom-endpoint/lsrpc")
    }

    fn payload() -> Value {
        json!({"method": "get_message", "params": {"msgId": "1757402775049"}})
    }

    /// Service nodes with known X25519 secrets, so tests can play the
    /// hops and peel what the builder produced.
    fn nodes_with_secrets<R: Rng + rand::CryptoRng>(rng: &mut R, count: usize) -> (Vec<ServiceNode>, Vec<StaticSecret>) {
        let mut nodes = Vec::with_capacity(count);
        let mut secrets = Vec::with_capacity(count);
        for index in 0..count {
            let (secret, public) = generate_keypair(rng);
            nodes.push(ServiceNode {
                pubkey_ed25519: hex::encode([index as u8 + 1; 32]),
                pubkey_x25519: hex::encode(public.as_bytes()),
                public_ip: format!("10.1.0.{}", index + 1),
                storage_port: 22_021,
                storage_lmq_port: 20_200,
                swarm_id: index as u64,
            });
            secrets.push(secret);
        }
        (nodes, secrets)
    }

    fn path_of(nodes: &[ServiceNode]) -> OnionPath {
        OnionPath {
            hops: nodes.iter().filter_map(PathHop::from_service_node).collect(),
        }
    }

    fn public_from_hex(hex_key: &str) -> PublicKey {
        let bytes: [u8; 32] = hex::decode(hex_key).unwrap().try_into().unwrap();
        PublicKey::from(bytes)
    }

    #[test]
    fn single_hop_envelope_peels_to_payload() {
        let mut rng = StdRng::seed_from_u64(1);
        let (nodes, secrets) = nodes_with_secrets(&mut rng, 1);
        let path = path_of(&nodes);

        let envelope = build_onion(&mut rng, &payload(), &destination(), &path).unwrap();
        assert_eq!(envelope.entry, path.hops[0]);

        let wrapper = Wrapper::decode(&envelope.bytes).unwrap();
        assert_eq!(wrapper.meta.enc_type, EncType::AesGcm);
        assert_eq!(
            wrapper.meta.ephemeral_key,
            hex::encode(envelope.entry_ephemeral_pub.as_bytes())
        );

        // The hop derives the layer key from its own secret and the
        // advertised ephemeral key.
        let ephemeral = public_from_hex(&wrapper.meta.ephemeral_key);
        let layer = open_from_peer(&wrapper.blob, &secrets[0], &ephemeral).unwrap();

        // A single hop is the terminal hop: its routing names the
        // destination.
        let frame = Frame::decode(&layer).unwrap();
        let routing: Destination = serde_json::from_slice(&frame.tail).unwrap();
        assert_eq!(routing, destination());

        // What the terminal hop forwards is the innermost payload frame.
        let payload_bytes = serde_json::to_vec(&payload()).unwrap();
        assert_eq!(&frame.inner[..4], &(payload_bytes.len() as u32).to_le_bytes());
        let inner = Frame::decode(&frame.inner).unwrap();
        assert_eq!(inner.inner, payload_bytes);
        assert_eq!(inner.tail, b"{\"headers\":{}}");
    }

    #[test]
    fn three_hop_envelope_peel_chain() {
        let mut rng = StdRng::seed_from_u64(7);
        let (nodes, secrets) = nodes_with_secrets(&mut rng, 3);
        let path = path_of(&nodes);

        let envelope = build_onion(&mut rng, &payload(), &destination(), &path).unwrap();
        let wrapper = Wrapper::decode(&envelope.bytes).unwrap();

        let mut blob = wrapper.blob;
        let mut ephemeral_hex = wrapper.meta.ephemeral_key;
        let mut layer_sizes = vec![envelope.bytes.len()];

        for (index, secret) in secrets.iter().enumerate() {
            let ephemeral = public_from_hex(&ephemeral_hex);
            let layer = open_from_peer(&blob, secret, &ephemeral).unwrap();
            // IV and tag overhead around each layer plaintext.
            assert_eq!(blob.len(), IV_SIZE + layer.len() + TAG_SIZE);

            let frame = Frame::decode(&layer).unwrap();
            if index < secrets.len() - 1 {
                let routing: RelayRouting = serde_json::from_slice(&frame.tail).unwrap();
                assert_eq!(routing.destination, path.hops[index + 1].ed25519_pubkey);
                assert_eq!(routing.enc_type, EncType::AesGcm);
                ephemeral_hex = routing.ephemeral_key;
                layer_sizes.push(frame.inner.len());
                blob = frame.inner;
            } else {
                let routing: Destination = serde_json::from_slice(&frame.tail).unwrap();
                assert_eq!(routing, destination());
                let inner = Frame::decode(&frame.inner).unwrap();
                assert_eq!(inner.inner, serde_json::to_vec(&payload()).unwrap());
                layer_sizes.push(frame.inner.len());
            }
        }

        // Every wrap grows the blob.
        for window in layer_sizes.windows(2) {
            assert!(window[0] > window[1]);
        }
        let payload_len = serde_json::to_vec(&payload()).unwrap().len();
        assert!(*layer_sizes.last().unwrap() > payload_len);
    }

    #[test]
    fn tampered_layer_fails_auth() {
        let mut rng = StdRng::seed_from_u64(3);
        let (nodes, secrets) = nodes_with_secrets(&mut rng, 2);
        let path = path_of(&nodes);

        let envelope = build_onion(&mut rng, &payload(), &destination(), &path).unwrap();
        let wrapper = Wrapper::decode(&envelope.bytes).unwrap();

        let mut tampered = wrapper.blob.clone();
        tampered[wrapper.blob.len() / 2] ^= 0x04;
        let ephemeral = public_from_hex(&wrapper.meta.ephemeral_key);
        assert_eq!(
            open_from_peer(&tampered, &secrets[0], &ephemeral).err(),
            Some(CryptoError::Auth)
        );
    }

    #[test]
    fn identical_rng_streams_build_identical_envelopes() {
        let mut seed_rng = StdRng::seed_from_u64(11);
        let (nodes, _) = nodes_with_secrets(&mut seed_rng, 3);
        let path = path_of(&nodes);

        let first = build_onion(&mut StdRng::seed_from_u64(42), &payload(), &destination(), &path).unwrap();
        let second = build_onion(&mut StdRng::seed_from_u64(42), &payload(), &destination(), &path).unwrap();
        assert_eq!(first.bytes, second.bytes);

        let third = build_onion(&mut StdRng::seed_from_u64(43), &payload(), &destination(), &path).unwrap();
        assert_ne!(first.bytes, third.bytes);
    }

    #[test]
    fn ephemeral_keys_never_repeat_across_builds() {
        let mut rng = thread_rng();
        let (nodes, secrets) = nodes_with_secrets(&mut rng, 3);
        let path = path_of(&nodes);

        let mut seen = HashSet::new();
        for _ in 0..100 {
            let envelope = build_onion(&mut rng, &payload(), &destination(), &path).unwrap();
            let wrapper = Wrapper::decode(&envelope.bytes).unwrap();

            let mut blob = wrapper.blob;
            let mut ephemeral_hex = wrapper.meta.ephemeral_key;
            for (index, secret) in secrets.iter().enumerate() {
                assert!(seen.insert(ephemeral_hex.clone()), "ephemeral key reused");
                let layer = open_from_peer(&blob, secret, &public_from_hex(&ephemeral_hex)).unwrap();
                let frame = Frame::decode(&layer).unwrap();
                if index < secrets.len() - 1 {
                    let routing: RelayRouting = serde_json::from_slice(&frame.tail).unwrap();
                    ephemeral_hex = routing.ephemeral_key;
                    blob = frame.inner;
                }
            }
        }
    }

    #[test]
    fn empty_payload_builds() {
        let mut rng = StdRng::seed_from_u64(5);
        let (nodes, secrets) = nodes_with_secrets(&mut rng, 1);
        let path = path_of(&nodes);

        let envelope = build_onion(&mut rng, &json!({}), &destination(), &path).unwrap();
        let wrapper = Wrapper::decode(&envelope.bytes).unwrap();
        let layer = open_from_peer(
            &wrapper.blob,
            &secrets[0],
            &public_from_hex(&wrapper.meta.ephemeral_key),
        )
        .unwrap();
        let frame = Frame::decode(&layer).unwrap();
        let inner = Frame::decode(&frame.inner).unwrap();
        assert_eq!(inner.inner, b"{}");
    }

    #[test]
    fn invalid_destination_rejected() {
        let mut rng = StdRng::seed_from_u64(9);
        let (nodes, _) = nodes_with_secrets(&mut rng, 1);
        let path = path_of(&nodes);

        let mut bad = destination();
        bad.host = String::new();
        assert_eq!(
            build_onion(&mut rng, &payload(), &bad, &path).err(),
            Some(BuildError::InvalidDestination)
        );

        let mut bad = destination();
        bad.target = "no-slash".to_owned();
        assert_eq!(
            build_onion(&mut rng, &payload(), &bad, &path).err(),
            Some(BuildError::InvalidDestination)
        );
    }

    #[test]
    fn empty_path_rejected() {
        let mut rng = StdRng::seed_from_u64(13);
        let path = OnionPath { hops: Vec::new() };
        assert_eq!(
            build_onion(&mut rng, &payload(), &destination(), &path).err(),
            Some(BuildError::Path(PathError::ZeroLength))
        );
    }

    #[test]
    fn builder_selects_path_from_snapshot() {
        let mut rng = thread_rng();
        let (nodes, _) = nodes_with_secrets(&mut rng, 5);
        let builder = OnionBuilder::with_nodes(&ClientConfig::default(), nodes);

        let envelope = builder.build(&payload(), &destination()).unwrap();
        assert!(builder
            .nodes()
            .iter()
            .any(|node| node.public_ip == envelope.entry.ip));
    }

    #[test]
    fn builder_insufficient_candidates() {
        let mut rng = thread_rng();
        let (nodes, _) = nodes_with_secrets(&mut rng, 2);
        let builder = OnionBuilder::with_nodes(&ClientConfig::default(), nodes);

        assert_eq!(
            builder.build(&payload(), &destination()).err(),
            Some(BuildError::Path(PathError::Insufficient { need: 3, got: 2 }))
        );
    }

    #[test]
    fn builder_set_nodes_swaps_list() {
        let mut rng = thread_rng();
        let (first, _) = nodes_with_secrets(&mut rng, 3);
        let (second, _) = nodes_with_secrets(&mut rng, 4);
        let builder = OnionBuilder::with_nodes(&ClientConfig::default(), first);

        assert_eq!(builder.nodes().len(), 3);
        builder.set_nodes(second);
        assert_eq!(builder.nodes().len(), 4);
    }
}
