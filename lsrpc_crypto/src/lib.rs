//! Functions for the per-hop crypto.
//!
//! Every onion layer is sealed with AES-256-GCM under a symmetric key the
//! sender and one hop agree on through X25519. The hop learns the sender's
//! ephemeral public key from the metadata of the enclosing layer, so the
//! derivation is direction-agnostic: both sides compute the same key from
//! their own secret and the other side's public key.

#![forbid(unsafe_code)]

use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hmac::{Hmac, Mac};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

pub use x25519_dalek::{PublicKey, StaticSecret};

/// Size of an X25519 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the random IV prepended to every sealed blob.
pub const IV_SIZE: usize = 12;
/// Size of the GCM authentication tag appended to every sealed blob.
pub const TAG_SIZE: usize = 16;
/// Smallest possible sealed blob: an IV and a tag around an empty plaintext.
pub const MIN_SEALED_SIZE: usize = IV_SIZE + TAG_SIZE;

/// HMAC key turning an X25519 shared secret into the AES key.
const KEY_SALT: &[u8; 4] = b"LOKI";

type HmacSha256 = Hmac<Sha256>;

/// Error that can happen during per-hop encryption or decryption.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CryptoError {
    /// Sealed input is shorter than an IV plus a tag.
    #[error("Sealed input is shorter than an IV plus a tag")]
    Short,
    /// GCM tag verification failed.
    #[error("GCM tag verification failed")]
    Auth,
    /// Random generator failed to produce an IV.
    #[error("Random generator failed to produce an IV")]
    Rng,
    /// Cipher backend rejected the input.
    #[error("Cipher backend rejected the input")]
    Backend,
}

/// Cipher announced through routing metadata. AES-GCM is the only value
/// peers accept; anything else fails parsing.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum EncType {
    /// AES-256-GCM with a 12-byte IV and a 16-byte tag.
    #[default]
    #[serde(rename = "aes-gcm")]
    AesGcm,
}

impl EncType {
    /// Wire name of the cipher.
    pub fn as_str(self) -> &'static str {
        "aes-gcm"
    }
}

impl FromStr for EncType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "aes-gcm" {
            Ok(EncType::AesGcm)
        } else {
            Err(CryptoError::Backend)
        }
    }
}

/// Symmetric key shared with a single hop. Wiped from memory on drop.
#[derive(Clone)]
pub struct HopKey(Zeroizing<[u8; KEY_SIZE]>);

impl HopKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Generate a fresh ephemeral X25519 keypair. Secrets are zeroized when
/// dropped and must never outlive the request they were generated for.
pub fn generate_keypair<R>(rng: &mut R) -> (StaticSecret, PublicKey)
where
    R: Rng + CryptoRng,
{
    let secret = StaticSecret::random_from_rng(&mut *rng);
    let public = PublicKey::from(&secret);
    (secret, public)
}

/// Derive the symmetric key shared with a hop.
///
/// `K = HMAC-SHA256(key = "LOKI", msg = X25519(secret, peer))`. The sender
/// passes its ephemeral secret and the hop's long-term public key; the hop
/// passes its own long-term secret and the advertised ephemeral public key.
/// Both arrive at the same key.
pub fn derive_hop_key(secret: &StaticSecret, peer: &PublicKey) -> HopKey {
    let shared = secret.diffie_hellman(peer);
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(KEY_SALT).expect("HMAC accepts any key length");
    mac.update(shared.as_bytes());
    let digest = mac.finalize().into_bytes();
    let mut key = Zeroizing::new([0; KEY_SIZE]);
    key.copy_from_slice(&digest);
    HopKey(key)
}

/// Seal plaintext for a hop.
///
/// Output is `IV(12) || AES-256-GCM ciphertext || tag(16)` with no
/// associated data. The IV is drawn fresh from `rng` on every call.
pub fn seal<R>(rng: &mut R, plaintext: &[u8], key: &HopKey) -> Result<Vec<u8>, CryptoError>
where
    R: Rng + CryptoRng,
{
    let mut iv = [0; IV_SIZE];
    rng.try_fill(&mut iv[..]).map_err(|_| CryptoError::Rng)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::Backend)?;
    let mut sealed = Vec::with_capacity(IV_SIZE + ciphertext.len());
    sealed.extend_from_slice(&iv);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open a sealed blob.
///
/// The first 12 bytes are the IV, the rest is GCM ciphertext plus tag.
/// Fails with `CryptoError::Short` on inputs shorter than 28 bytes and
/// `CryptoError::Auth` when the tag does not verify.
pub fn open(sealed: &[u8], key: &HopKey) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < MIN_SEALED_SIZE {
        return Err(CryptoError::Short);
    }
    let (iv, ciphertext) = sealed.split_at(IV_SIZE);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::Auth)
}

/// Seal plaintext for a hop, deriving the key from the sender's ephemeral
/// secret and the hop's public key.
pub fn seal_for_hop<R>(
    rng: &mut R,
    plaintext: &[u8],
    sender_secret: &StaticSecret,
    hop_public: &PublicKey,
) -> Result<Vec<u8>, CryptoError>
where
    R: Rng + CryptoRng,
{
    let key = derive_hop_key(sender_secret, hop_public);
    seal(rng, plaintext, &key)
}

/// Open a sealed blob received from a peer, deriving the key from the
/// receiver's own secret and the peer's advertised public key.
pub fn open_from_peer(
    sealed: &[u8],
    receiver_secret: &StaticSecret,
    peer_public: &PublicKey,
) -> Result<Vec<u8>, CryptoError> {
    let key = derive_hop_key(receiver_secret, peer_public);
    open(sealed, &key)
}
